//! Run-length encoded images
//!
//! Artwork is stored in the gdk-pixbuf C-source RLE layout:
//! - a length byte `n`
//! - `n & 0x80` set: one pixel follows, repeated `n & 0x7f` times
//! - otherwise: `n` literal pixels follow
//!
//! Pixels are RGB or RGBA. With RGBA, pixels whose alpha is zero are not
//! drawn. Rows wrap after `rowstride` bytes.

use alloc::vec::Vec;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;

/// Longest run a single length byte can describe
const MAX_RUN: usize = 0x7f;

/// Largest accepted width or height
pub const MAX_DIMENSION: u32 = 1 << 15;

/// Errors building an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageError {
    /// Only 3 (RGB) and 4 (RGBA) bytes per pixel are supported
    UnsupportedDepth,
    /// Rowstride shorter than one row of pixels
    InvalidRowstride,
    /// Zero width or height
    Empty,
    /// Width or height beyond [`MAX_DIMENSION`]
    TooLarge,
}

/// An RLE compressed image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    bytes_per_pixel: u8,
    rowstride: u32,
    data: Vec<u8>,
}

impl Image {
    /// Wrap RLE data with its geometry
    pub fn new(
        width: u32,
        height: u32,
        bytes_per_pixel: u8,
        rowstride: u32,
        data: Vec<u8>,
    ) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::Empty);
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(ImageError::TooLarge);
        }
        if !matches!(bytes_per_pixel, 3 | 4) {
            return Err(ImageError::UnsupportedDepth);
        }
        if rowstride < width * u32::from(bytes_per_pixel) {
            return Err(ImageError::InvalidRowstride);
        }

        Ok(Self {
            width,
            height,
            bytes_per_pixel,
            rowstride,
            data,
        })
    }

    /// Compress raw, tightly packed RGB/RGBA pixel rows
    pub fn encode(
        width: u32,
        height: u32,
        bytes_per_pixel: u8,
        pixels: &[u8],
    ) -> Result<Self, ImageError> {
        let rowstride = width.saturating_mul(u32::from(bytes_per_pixel));
        let data = encode(pixels, usize::from(bytes_per_pixel));
        Self::new(width, height, bytes_per_pixel, rowstride, data)
    }

    /// Image size in pixels
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Bytes per pixel (3 or 4)
    pub fn bytes_per_pixel(&self) -> u8 {
        self.bytes_per_pixel
    }

    /// Compressed pixel data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Decode into positioned pixels, relative to the image origin
    ///
    /// Transparent pixels are skipped. Truncated data simply ends early.
    pub fn pixels(&self) -> Pixels<'_> {
        Pixels {
            image: self,
            pos: 0,
            run_left: 0,
            run_pixel: None,
            literal_left: 0,
            x: 0,
            y: 0,
        }
    }
}

/// Iterator over the decoded pixels of an [`Image`]
pub struct Pixels<'a> {
    image: &'a Image,
    /// Read position in the compressed data
    pos: usize,
    run_left: usize,
    run_pixel: Option<usize>,
    literal_left: usize,
    x: u32,
    y: u32,
}

impl Pixels<'_> {
    /// Offset of the next pixel's bytes, advancing through the RLE stream
    fn next_offset(&mut self) -> Option<usize> {
        let bpp = usize::from(self.image.bytes_per_pixel);
        let data = &self.image.data;

        loop {
            if self.run_left > 0 {
                self.run_left -= 1;
                let offset = self.run_pixel?;
                if self.run_left == 0 {
                    self.run_pixel = None;
                }
                return Some(offset);
            }

            if self.literal_left > 0 {
                self.literal_left -= 1;
                let offset = self.pos;
                if offset + bpp > data.len() {
                    return None;
                }
                self.pos += bpp;
                return Some(offset);
            }

            let len = *data.get(self.pos)?;
            self.pos += 1;

            if len & 0x80 != 0 {
                if self.pos + bpp > data.len() {
                    return None;
                }
                self.run_left = usize::from(len & 0x7f);
                self.run_pixel = Some(self.pos);
                self.pos += bpp;
            } else {
                self.literal_left = usize::from(len);
            }
        }
    }
}

impl Iterator for Pixels<'_> {
    type Item = Pixel<Rgb888>;

    fn next(&mut self) -> Option<Self::Item> {
        let bpp = u32::from(self.image.bytes_per_pixel);

        loop {
            if self.y >= self.image.height {
                return None;
            }

            let offset = self.next_offset()?;
            let px = &self.image.data[offset..offset + bpp as usize];
            let point = Point::new(self.x as i32, self.y as i32);

            self.x += 1;
            if self.x * bpp >= self.image.rowstride {
                self.x = 0;
                self.y += 1;
            }

            // Padding columns beyond the width are never drawn
            if point.x as u32 >= self.image.width {
                continue;
            }
            if bpp == 4 && px[3] == 0 {
                continue;
            }

            return Some(Pixel(point, Rgb888::new(px[0], px[1], px[2])));
        }
    }
}

/// RLE-compress a packed pixel stream
pub fn encode(pixels: &[u8], bytes_per_pixel: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let chunks: Vec<&[u8]> = pixels.chunks_exact(bytes_per_pixel).collect();
    let mut i = 0;

    while i < chunks.len() {
        let mut run = 1;
        while i + run < chunks.len() && run < MAX_RUN && chunks[i + run] == chunks[i] {
            run += 1;
        }

        if run > 1 {
            out.push(0x80 | run as u8);
            out.extend_from_slice(chunks[i]);
            i += run;
            continue;
        }

        // Literal stretch until the next repeat starts
        let start = i;
        while i < chunks.len()
            && i - start < MAX_RUN
            && !(i + 1 < chunks.len() && chunks[i + 1] == chunks[i])
        {
            i += 1;
        }
        out.push((i - start) as u8);
        for chunk in &chunks[start..i] {
            out.extend_from_slice(chunk);
        }
    }

    out
}
