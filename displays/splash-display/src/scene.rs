//! Scene description
//!
//! Everything about the splash picture that does not depend on the screen
//! size: colors, font, artwork and which elements are shown.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use embedded_graphics::mono_font::MonoFont;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;

use crate::font::default_font;
use crate::layout::{Layout, DEFAULT_BAR_SIZE, DEFAULT_SPLIT_DENOMINATOR, DEFAULT_SPLIT_NUMERATOR};
use crate::rle::Image;

/// Width of the outline drawn in the generated bar artwork
const BAR_OUTLINE: u32 = 2;

/// Gap between the bar artwork edge and its outline
const BAR_MARGIN: u32 = 4;

/// Colors of the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Rgb888,
    pub text: Rgb888,
    pub bar: Rgb888,
    pub bar_background: Rgb888,
}

impl Palette {
    /// Convert a `0xRRGGBB` value
    pub const fn from_rgb(rgb: u32) -> Rgb888 {
        Rgb888::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Self::from_rgb(0xecece1),
            text: Self::from_rgb(0x6d6d70),
            bar: Self::from_rgb(0x6d6d70),
            bar_background: Self::from_rgb(0xecece1),
        }
    }
}

/// The splash picture
#[derive(Clone)]
pub struct Scene {
    pub palette: Palette,
    pub font: &'static MonoFont<'static>,
    /// Logo artwork, if any
    pub logo: Option<Image>,
    /// Artwork behind the progress track
    pub bar: Option<Image>,
    /// Size reserved for the bar artwork
    pub bar_size: Size,
    /// Message shown before the first command arrives
    pub startup_message: Option<String>,
    pub show_progress_bar: bool,
    pub split_numerator: u32,
    pub split_denominator: u32,
    /// Center the logo on the whole screen instead of above the split
    pub fullscreen_logo: bool,
}

impl Default for Scene {
    fn default() -> Self {
        let palette = Palette::default();
        Self {
            bar: bar_image(DEFAULT_BAR_SIZE, &palette),
            palette,
            font: default_font(),
            logo: None,
            bar_size: DEFAULT_BAR_SIZE,
            startup_message: None,
            show_progress_bar: true,
            split_numerator: DEFAULT_SPLIT_NUMERATOR,
            split_denominator: DEFAULT_SPLIT_DENOMINATOR,
            fullscreen_logo: false,
        }
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("palette", &self.palette)
            .field("font", &self.font.character_size)
            .field("logo", &self.logo.as_ref().map(Image::size))
            .field("bar_size", &self.bar_size)
            .field("startup_message", &self.startup_message)
            .field("show_progress_bar", &self.show_progress_bar)
            .field("split", &(self.split_numerator, self.split_denominator))
            .field("fullscreen_logo", &self.fullscreen_logo)
            .finish()
    }
}

impl Scene {
    /// Use a bar of a different size, regenerating its artwork
    pub fn with_bar_size(mut self, size: Size) -> Self {
        self.bar = bar_image(size, &self.palette);
        self.bar_size = size;
        self
    }

    /// Geometry of this scene on a screen of the given size
    pub fn layout(&self, screen: Size) -> Layout {
        Layout {
            size: screen,
            split_numerator: self.split_numerator,
            split_denominator: self.split_denominator,
            bar_size: self.bar_size,
            fullscreen_logo: self.fullscreen_logo,
        }
    }
}

/// Generate bar artwork: an outlined frame around the progress track
///
/// Returns `None` for a zero-sized bar.
pub fn bar_image(size: Size, palette: &Palette) -> Option<Image> {
    let (width, height) = (size.width, size.height);
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);

    let outer = BAR_MARGIN;
    let inner = BAR_MARGIN + BAR_OUTLINE;
    for y in 0..height {
        for x in 0..width {
            let in_outer = x >= outer && y >= outer && x + outer < width && y + outer < height;
            let in_inner = x >= inner && y >= inner && x + inner < width && y + inner < height;
            let color = if in_outer && !in_inner {
                palette.bar
            } else if in_inner {
                palette.bar_background
            } else {
                palette.background
            };
            pixels.extend_from_slice(&[color.r(), color.g(), color.b()]);
        }
    }

    Image::encode(width, height, 3, &pixels).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_from_rgb() {
        assert_eq!(Palette::from_rgb(0x123456), Rgb888::new(0x12, 0x34, 0x56));
        assert_eq!(Palette::default().text, Rgb888::new(0x6d, 0x6d, 0x70));
    }

    #[test]
    fn test_bar_image_outline() {
        let palette = Palette::default();
        let image = bar_image(Size::new(40, 20), &palette).unwrap();
        let pixels: Vec<_> = image.pixels().collect();
        assert_eq!(pixels.len(), 800);

        let at = |x: i32, y: i32| {
            pixels
                .iter()
                .find(|Pixel(p, _)| *p == Point::new(x, y))
                .map(|Pixel(_, c)| *c)
        };
        assert_eq!(at(0, 0), Some(palette.background));
        assert_eq!(at(4, 4), Some(palette.bar));
        assert_eq!(at(5, 10), Some(palette.bar));
        assert_eq!(at(20, 10), Some(palette.bar_background));
        assert_eq!(at(35, 15), Some(palette.bar));
    }

    #[test]
    fn test_zero_sized_bar() {
        let scene = Scene::default().with_bar_size(Size::zero());
        assert!(scene.bar.is_none());
        let layout = scene.layout(Size::new(100, 100));
        assert_eq!(layout.bar_track().size, Size::zero());
        assert!(layout.progress_split(100).filled.is_zero_sized());
    }
}
