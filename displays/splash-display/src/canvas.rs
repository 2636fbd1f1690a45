//! In-memory working buffer
//!
//! Every draw lands here first. The canvas remembers the bounding box of
//! everything touched since the last flip, so a flip only has to copy the
//! modified region to the panel.

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

/// Pixel buffer in logical (post-rotation) coordinates
#[derive(Debug, Clone)]
pub struct Canvas {
    size: Size,
    pixels: Vec<Rgb888>,
    /// Region modified since the last `take_dirty`
    dirty: Option<Rectangle>,
}

impl Canvas {
    /// Create a black canvas
    pub fn new(size: Size) -> Self {
        let len = size.width as usize * size.height as usize;
        Self {
            size,
            pixels: vec![Rgb888::BLACK; len],
            dirty: None,
        }
    }

    /// Color at `point`, or `None` outside the canvas
    pub fn pixel(&self, point: Point) -> Option<Rgb888> {
        self.index(point).map(|i| self.pixels[i])
    }

    /// Region modified since the last call, clearing it
    pub fn take_dirty(&mut self) -> Option<Rectangle> {
        self.dirty.take()
    }

    /// Region modified since the last `take_dirty`
    pub fn dirty(&self) -> Option<Rectangle> {
        self.dirty
    }

    /// Returns true if every pixel of `area` has `color`
    pub fn is_filled(&self, area: &Rectangle, color: Rgb888) -> bool {
        area.points().all(|p| self.pixel(p) == Some(color))
    }

    fn index(&self, point: Point) -> Option<usize> {
        let (x, y) = (point.x, point.y);
        if x < 0 || y < 0 || x as u32 >= self.size.width || y as u32 >= self.size.height {
            return None;
        }
        Some(y as usize * self.size.width as usize + x as usize)
    }

    fn touch(&mut self, area: Rectangle) {
        self.dirty = Some(match self.dirty {
            Some(dirty) => envelope(&dirty, &area),
            None => area,
        });
    }
}

/// Smallest rectangle containing both `a` and `b`
pub fn envelope(a: &Rectangle, b: &Rectangle) -> Rectangle {
    if a.is_zero_sized() {
        return *b;
    }
    if b.is_zero_sized() {
        return *a;
    }

    let left = a.top_left.x.min(b.top_left.x);
    let top = a.top_left.y.min(b.top_left.y);
    let right = (a.top_left.x + a.size.width as i32).max(b.top_left.x + b.size.width as i32);
    let bottom = (a.top_left.y + a.size.height as i32).max(b.top_left.y + b.size.height as i32);

    Rectangle::new(
        Point::new(left, top),
        Size::new((right - left) as u32, (bottom - top) as u32),
    )
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for Canvas {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let mut min = Point::new(i32::MAX, i32::MAX);
        let mut max = Point::new(i32::MIN, i32::MIN);

        for Pixel(point, color) in pixels {
            if let Some(i) = self.index(point) {
                self.pixels[i] = color;
                min = min.component_min(point);
                max = max.component_max(point);
            }
        }

        if min.x <= max.x {
            self.touch(Rectangle::with_corners(min, max));
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        if area.is_zero_sized() {
            return Ok(());
        }

        let width = self.size.width as usize;
        let x0 = area.top_left.x as usize;
        let x1 = x0 + area.size.width as usize;
        for y in area.rows() {
            let start = y as usize * width;
            self.pixels[start + x0..start + x1].fill(color);
        }

        self.touch(area);
        Ok(())
    }
}
