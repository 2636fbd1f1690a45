//! Rendering surface trait
//!
//! Defines the drawing contract the dispatcher renders through. Draw calls
//! only touch the working buffer and cannot fail; `flip` commits the
//! working buffer and is the only fallible operation.

use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::renderer::TextRenderer;
use embedded_graphics::text::{Baseline, Text};

use crate::canvas::Canvas;
use crate::panel::Panel;
use crate::rle::Image;

/// Drawing surface
pub trait Surface {
    /// Error type for flips
    type Error;

    /// Logical surface size
    fn size(&self) -> Size;

    /// Fill a rectangle
    fn draw_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgb888);

    /// Blit an RLE image with its top-left corner at (`x`, `y`)
    fn draw_image(&mut self, x: i32, y: i32, image: &Image);

    /// Draw text with its top-left corner at (`x`, `y`)
    ///
    /// Only glyph pixels are drawn; the background shows through.
    fn draw_text(&mut self, x: i32, y: i32, color: Rgb888, font: &MonoFont<'_>, text: &str);

    /// Size of the box `text` occupies when drawn with `font`
    fn measure_text(&self, font: &MonoFont<'_>, text: &str) -> Size;

    /// Commit drawn pixels to the display
    ///
    /// With `full_sync` the whole picture is copied to every display page;
    /// otherwise only the region modified since the last flip.
    fn flip(&mut self, full_sync: bool) -> Result<(), Self::Error>;
}

/// Surface drawing into a [`Canvas`] and flipping to a [`Panel`]
#[derive(Debug)]
pub struct BufferedSurface<P> {
    canvas: Canvas,
    panel: P,
}

impl<P: Panel> BufferedSurface<P> {
    /// Create a surface sized to the panel
    pub fn new(panel: P) -> Self {
        Self {
            canvas: Canvas::new(panel.size()),
            panel,
        }
    }

    /// Working buffer
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Panel behind this surface
    pub fn panel(&self) -> &P {
        &self.panel
    }
}

impl<P: Panel> Surface for BufferedSurface<P> {
    type Error = P::Error;

    fn size(&self) -> Size {
        self.canvas.size()
    }

    fn draw_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgb888) {
        let area = Rectangle::new(Point::new(x, y), Size::new(width, height));
        let _ = self.canvas.fill_solid(&area, color);
    }

    fn draw_image(&mut self, x: i32, y: i32, image: &Image) {
        let origin = Point::new(x, y);
        let pixels = image
            .pixels()
            .map(|Pixel(point, color)| Pixel(point + origin, color));
        let _ = self.canvas.draw_iter(pixels);
    }

    fn draw_text(&mut self, x: i32, y: i32, color: Rgb888, font: &MonoFont<'_>, text: &str) {
        let style = MonoTextStyle::new(font, color);
        let _ = Text::with_baseline(text, Point::new(x, y), style, Baseline::Top)
            .draw(&mut self.canvas);
    }

    fn measure_text(&self, font: &MonoFont<'_>, text: &str) -> Size {
        MonoTextStyle::new(font, Rgb888::WHITE)
            .measure_string(text, Point::zero(), Baseline::Top)
            .bounding_box
            .size
    }

    fn flip(&mut self, full_sync: bool) -> Result<(), Self::Error> {
        let dirty = self.canvas.take_dirty();
        let region = if full_sync {
            Some(self.canvas.bounding_box())
        } else {
            dirty
        };
        self.panel.present(&self.canvas, region, full_sync)
    }
}
