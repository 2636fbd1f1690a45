//! Display panel trait
//!
//! A panel is the physical side of a flip: it copies pixels from the
//! working [`Canvas`] into display memory. Double-buffered panels keep two
//! pages and show one while the other is updated.

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use crate::canvas::Canvas;

/// Screen rotation, clockwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Parse an angle in degrees
    pub fn from_degrees(angle: u16) -> Option<Self> {
        match angle {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    /// Angle in degrees
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Returns true if width and height swap
    pub fn is_transposed(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }

    /// Logical canvas size for a physical display size
    pub fn logical_size(self, physical: Size) -> Size {
        if self.is_transposed() {
            Size::new(physical.height, physical.width)
        } else {
            physical
        }
    }

    /// Map a logical point to physical display coordinates
    pub fn to_physical(self, point: Point, physical: Size) -> Point {
        let (w, h) = (physical.width as i32, physical.height as i32);
        match self {
            Rotation::Deg0 => point,
            Rotation::Deg90 => Point::new(w - 1 - point.y, point.x),
            Rotation::Deg180 => Point::new(w - 1 - point.x, h - 1 - point.y),
            Rotation::Deg270 => Point::new(point.y, h - 1 - point.x),
        }
    }
}

/// Physical display behind a surface
pub trait Panel {
    /// Error type for commit operations
    type Error;

    /// Logical size of the display (after rotation)
    fn size(&self) -> Size;

    /// Commit canvas pixels to the display
    ///
    /// - `region`: area modified since the previous flip, if any
    /// - `full_sync`: copy the whole canvas to every page, so later partial
    ///   updates can build on an identical scene
    fn present(
        &mut self,
        canvas: &Canvas,
        region: Option<Rectangle>,
        full_sync: bool,
    ) -> Result<(), Self::Error>;
}

/// One recorded flip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlipRecord {
    pub region: Option<Rectangle>,
    pub full_sync: bool,
}

/// Panel backed by plain memory
///
/// Keeps the committed picture and a log of every flip. Used for headless
/// runs and by the tests to check what actually reached the display.
#[derive(Debug, Clone)]
pub struct MemoryPanel {
    size: Size,
    front: Vec<Rgb888>,
    flips: Vec<FlipRecord>,
}

impl MemoryPanel {
    /// Create a panel of the given logical size
    pub fn new(size: Size) -> Self {
        Self {
            size,
            front: vec![Rgb888::BLACK; size.width as usize * size.height as usize],
            flips: Vec::new(),
        }
    }

    /// Committed color at `point`
    pub fn pixel(&self, point: Point) -> Option<Rgb888> {
        if !self.size_rect().contains(point) {
            return None;
        }
        Some(self.front[point.y as usize * self.size.width as usize + point.x as usize])
    }

    /// Every flip so far, oldest first
    pub fn flips(&self) -> &[FlipRecord] {
        &self.flips
    }

    fn size_rect(&self) -> Rectangle {
        Rectangle::new(Point::zero(), self.size)
    }
}

impl Panel for MemoryPanel {
    type Error = Infallible;

    fn size(&self) -> Size {
        self.size
    }

    fn present(
        &mut self,
        canvas: &Canvas,
        region: Option<Rectangle>,
        full_sync: bool,
    ) -> Result<(), Self::Error> {
        self.flips.push(FlipRecord { region, full_sync });

        let area = if full_sync {
            Some(self.size_rect())
        } else {
            region.map(|r| r.intersection(&self.size_rect()))
        };

        if let Some(area) = area {
            for point in area.points() {
                if let Some(color) = canvas.pixel(point) {
                    self.front[point.y as usize * self.size.width as usize + point.x as usize] =
                        color;
                }
            }
        }
        Ok(())
    }
}
