//! Scene geometry
//!
//! The screen is divided by a horizontal split line. The logo sits in the
//! part above it, the status message ends right on it and the progress bar
//! hangs below it.
//!
//! ```text
//!   ┌──────────────────────────┐
//!   │           logo           │
//!   │                          │
//!   │        message text      │
//!   ├──────────────────────────┤  split line
//!   │   [██████████░░░░░░░]    │  bar image, track inset by 8 px
//!   └──────────────────────────┘
//! ```

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

/// Gap between the bar image edge and its track
pub const BAR_TRACK_INSET: u32 = 8;

/// Default split fraction, numerator
pub const DEFAULT_SPLIT_NUMERATOR: u32 = 5;

/// Default split fraction, denominator
pub const DEFAULT_SPLIT_DENOMINATOR: u32 = 6;

/// Largest accepted split denominator
pub const MAX_SPLIT_DENOMINATOR: u32 = 1000;

/// Default bar image size
pub const DEFAULT_BAR_SIZE: Size = Size::new(460, 36);

/// Geometry of the splash scene for one screen size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Logical screen size
    pub size: Size,
    pub split_numerator: u32,
    pub split_denominator: u32,
    /// Size of the progress bar image
    pub bar_size: Size,
    /// Center the logo on the whole screen instead of above the split
    pub fullscreen_logo: bool,
}

/// Both halves of a progress track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSplit {
    /// Part shown in the bar color
    pub filled: Rectangle,
    /// Part shown in the bar background color
    pub empty: Rectangle,
}

impl Layout {
    /// Default layout for a screen size
    pub const fn new(size: Size) -> Self {
        Self {
            size,
            split_numerator: DEFAULT_SPLIT_NUMERATOR,
            split_denominator: DEFAULT_SPLIT_DENOMINATOR,
            bar_size: DEFAULT_BAR_SIZE,
            fullscreen_logo: false,
        }
    }

    fn width(&self) -> i64 {
        i64::from(self.size.width)
    }

    fn height(&self) -> i64 {
        i64::from(self.size.height)
    }

    /// Split fraction with the denominator at least 1 and the fraction at most 1
    fn fraction(&self) -> (i64, i64) {
        let den = i64::from(self.split_denominator.max(1));
        let num = i64::from(self.split_numerator).min(den);
        (num, den)
    }

    /// Y coordinate of the split line
    pub fn split_line(&self) -> i32 {
        let (num, den) = self.fraction();
        coord(self.height() - (den - num) * self.height() / den)
    }

    /// Band cleared for a message of the given text height
    ///
    /// Spans the full width; its bottom edge sits on the split line.
    pub fn message_band(&self, text_height: u32) -> Rectangle {
        Rectangle::new(
            Point::new(
                0,
                coord(i64::from(self.split_line()) - i64::from(text_height)),
            ),
            Size::new(self.size.width, text_height),
        )
    }

    /// Top-left corner of a message of the given size
    pub fn message_origin(&self, text: Size) -> Point {
        Point::new(
            centered(self.width(), text.width),
            coord(i64::from(self.split_line()) - i64::from(text.height)),
        )
    }

    /// Top-left corner of a logo of the given size
    pub fn logo_origin(&self, logo: Size) -> Point {
        let y = if self.fullscreen_logo {
            centered(self.height(), logo.height)
        } else {
            let (num, den) = self.fraction();
            centered(self.height() * num / den, logo.height)
        };
        Point::new(centered(self.width(), logo.width), y)
    }

    /// Top-left corner of the bar image
    pub fn bar_origin(&self) -> Point {
        Point::new(centered(self.width(), self.bar_size.width), self.split_line())
    }

    /// Track inside the bar image that shows progress
    pub fn bar_track(&self) -> Rectangle {
        let inset = BAR_TRACK_INSET as i32;
        Rectangle::new(
            self.bar_origin() + Point::new(inset, inset),
            Size::new(
                self.bar_size.width.saturating_sub(2 * BAR_TRACK_INSET),
                self.bar_size.height.saturating_sub(2 * BAR_TRACK_INSET),
            ),
        )
    }

    /// Split the track for a progress value
    ///
    /// Positive values fill from the left, zero and negative values fill
    /// from the right. Magnitudes beyond 100 are clamped.
    pub fn progress_split(&self, value: i32) -> ProgressSplit {
        let track = self.bar_track();
        let (x, y) = (track.top_left.x, track.top_left.y);
        let (width, height) = (track.size.width, track.size.height);

        if value > 0 {
            let filled = fill_width(value, width);
            ProgressSplit {
                filled: Rectangle::new(Point::new(x, y), Size::new(filled, height)),
                empty: Rectangle::new(
                    Point::new(x + filled as i32, y),
                    Size::new(width - filled, height),
                ),
            }
        } else {
            let filled = fill_width(value.saturating_neg(), width);
            ProgressSplit {
                filled: Rectangle::new(
                    Point::new(x + (width - filled) as i32, y),
                    Size::new(filled, height),
                ),
                empty: Rectangle::new(Point::new(x, y), Size::new(width - filled, height)),
            }
        }
    }
}

/// Offset that centers `length` within `span`
fn centered(span: i64, length: u32) -> i32 {
    coord((span - i64::from(length)) / 2)
}

fn coord(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Pixels of `width` covered by a percentage
fn fill_width(percent: i32, width: u32) -> u32 {
    let percent = percent.clamp(0, 100) as u32;
    percent * width / 100
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> Layout {
        Layout::new(Size::new(640, 480))
    }

    #[test]
    fn test_split_line() {
        // 480 - 1 * 480 / 6
        assert_eq!(layout().split_line(), 400);

        let half = Layout {
            split_numerator: 1,
            split_denominator: 2,
            ..layout()
        };
        assert_eq!(half.split_line(), 240);
    }

    #[test]
    fn test_degenerate_split_fraction() {
        let zero_den = Layout {
            split_denominator: 0,
            ..layout()
        };
        // Fraction clamps to 1/1, putting the split on the bottom edge
        assert_eq!(zero_den.split_line(), 480);
    }

    #[test]
    fn test_huge_split_denominator() {
        let l = Layout {
            size: Size::new(1920, 1080),
            split_numerator: 0,
            split_denominator: 10_000_000,
            ..layout()
        };
        assert_eq!(l.split_line(), 0);
        assert_eq!(l.logo_origin(Size::new(100, 100)), Point::new(910, -50));

        let widest = Layout {
            split_numerator: u32::MAX,
            split_denominator: u32::MAX,
            ..l
        };
        assert_eq!(widest.split_line(), 1080);
    }

    #[test]
    fn test_message_geometry() {
        let l = layout();
        let band = l.message_band(15);
        assert_eq!(band, Rectangle::new(Point::new(0, 385), Size::new(640, 15)));
        assert_eq!(l.message_origin(Size::new(90, 15)), Point::new(275, 385));
    }

    #[test]
    fn test_logo_origin() {
        let mut l = layout();
        // (480 * 5 / 6 - 100) / 2 = 150
        assert_eq!(l.logo_origin(Size::new(200, 100)), Point::new(220, 150));
        l.fullscreen_logo = true;
        assert_eq!(l.logo_origin(Size::new(200, 100)), Point::new(220, 190));
    }

    #[test]
    fn test_bar_track() {
        let l = layout();
        assert_eq!(l.bar_origin(), Point::new(90, 400));
        assert_eq!(
            l.bar_track(),
            Rectangle::new(Point::new(98, 408), Size::new(444, 20))
        );
    }

    #[test]
    fn test_progress_from_left() {
        let split = layout().progress_split(50);
        assert_eq!(split.filled, Rectangle::new(Point::new(98, 408), Size::new(222, 20)));
        assert_eq!(split.empty, Rectangle::new(Point::new(320, 408), Size::new(222, 20)));
    }

    #[test]
    fn test_progress_from_right() {
        let split = layout().progress_split(-25);
        assert_eq!(split.filled, Rectangle::new(Point::new(431, 408), Size::new(111, 20)));
        assert_eq!(split.empty, Rectangle::new(Point::new(98, 408), Size::new(333, 20)));
    }

    #[test]
    fn test_progress_clamped() {
        let l = layout();
        let track = l.bar_track();
        assert_eq!(l.progress_split(250).filled, track);
        assert_eq!(l.progress_split(i32::MIN).filled, track);
        assert_eq!(l.progress_split(0).empty, track);
        assert_eq!(l.progress_split(0).filled.size.width, 0);
    }
}
