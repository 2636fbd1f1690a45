//! Linux framebuffer panel
//!
//! Maps `/dev/fbN` and commits canvas regions to it. When the virtual
//! resolution holds two screens the panel double-buffers: updates go to the
//! hidden page, which is then panned into view. Regions written to one page
//! are remembered as pending for the other, so the next flip brings that page
//! up to date before showing it.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use memmap2::{MmapMut, MmapOptions};
use nix::errno::Errno;
use nix::libc::c_ulong;
use splash_display::canvas::envelope;
use splash_display::{Canvas, Panel, Rotation};
use tracing::{debug, info, warn};

/// Framebuffer ioctls from `linux/fb.h`
mod ioctl {
    use super::{FbFixScreenInfo, FbVarScreenInfo};

    nix::ioctl_read_bad!(get_vscreeninfo, 0x4600, FbVarScreenInfo);
    nix::ioctl_write_ptr_bad!(put_vscreeninfo, 0x4601, FbVarScreenInfo);
    nix::ioctl_read_bad!(get_fscreeninfo, 0x4602, FbFixScreenInfo);
    nix::ioctl_write_ptr_bad!(pan_display, 0x4606, FbVarScreenInfo);
}

/// `FB_VISUAL_TRUECOLOR`
const VISUAL_TRUECOLOR: u32 = 2;

/// `FB_ACTIVATE_NOW`
const ACTIVATE_NOW: u32 = 0;

/// One color channel inside a packed pixel
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FbBitfield {
    pub offset: u32,
    pub length: u32,
    pub msb_right: u32,
}

/// `struct fb_var_screeninfo`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FbVarScreenInfo {
    pub xres: u32,
    pub yres: u32,
    pub xres_virtual: u32,
    pub yres_virtual: u32,
    pub xoffset: u32,
    pub yoffset: u32,
    pub bits_per_pixel: u32,
    pub grayscale: u32,
    pub red: FbBitfield,
    pub green: FbBitfield,
    pub blue: FbBitfield,
    pub transp: FbBitfield,
    pub nonstd: u32,
    pub activate: u32,
    pub height: u32,
    pub width: u32,
    pub accel_flags: u32,
    pub pixclock: u32,
    pub left_margin: u32,
    pub right_margin: u32,
    pub upper_margin: u32,
    pub lower_margin: u32,
    pub hsync_len: u32,
    pub vsync_len: u32,
    pub sync: u32,
    pub vmode: u32,
    pub rotate: u32,
    pub colorspace: u32,
    pub reserved: [u32; 4],
}

/// `struct fb_fix_screeninfo`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FbFixScreenInfo {
    pub id: [u8; 16],
    pub smem_start: c_ulong,
    pub smem_len: u32,
    pub type_: u32,
    pub type_aux: u32,
    pub visual: u32,
    pub xpanstep: u16,
    pub ypanstep: u16,
    pub ywrapstep: u16,
    pub line_length: u32,
    pub mmio_start: c_ulong,
    pub mmio_len: u32,
    pub accel: u32,
    pub capabilities: u16,
    pub reserved: [u16; 2],
}

/// Errors from framebuffer operations
#[derive(Debug, thiserror::Error)]
pub enum FbError {
    #[error("failed to open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("{request} failed: {source}")]
    Ioctl {
        request: &'static str,
        source: Errno,
    },

    #[error("failed to map framebuffer memory: {0}")]
    Map(io::Error),

    #[error("unsupported pixel format: {bits_per_pixel} bpp, visual {visual}")]
    UnsupportedFormat { bits_per_pixel: u32, visual: u32 },

    #[error("framebuffer memory too small: {needed} bytes needed, {available} mapped")]
    TooSmall { needed: usize, available: usize },
}

/// Path of framebuffer device `index`
pub fn fb_path(index: u8) -> PathBuf {
    PathBuf::from(format!("/dev/fb{index}"))
}

/// Packed pixel layout of a truecolor framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormat {
    /// Bytes per pixel: 2, 3 or 4
    pub bytes: usize,
    pub red: FbBitfield,
    pub green: FbBitfield,
    pub blue: FbBitfield,
}

impl PixelFormat {
    /// Layout described by the variable screen info
    pub fn from_var(var: &FbVarScreenInfo, visual: u32) -> Result<Self, FbError> {
        let bytes = match var.bits_per_pixel {
            16 => 2,
            24 => 3,
            32 => 4,
            _ => 0,
        };
        if bytes == 0 || visual != VISUAL_TRUECOLOR {
            return Err(FbError::UnsupportedFormat {
                bits_per_pixel: var.bits_per_pixel,
                visual,
            });
        }
        Ok(Self {
            bytes,
            red: var.red,
            green: var.green,
            blue: var.blue,
        })
    }

    /// 16-bit RGB565
    pub const fn rgb565() -> Self {
        Self {
            bytes: 2,
            red: FbBitfield { offset: 11, length: 5, msb_right: 0 },
            green: FbBitfield { offset: 5, length: 6, msb_right: 0 },
            blue: FbBitfield { offset: 0, length: 5, msb_right: 0 },
        }
    }

    /// 32-bit XRGB8888
    pub const fn xrgb8888() -> Self {
        Self {
            bytes: 4,
            red: FbBitfield { offset: 16, length: 8, msb_right: 0 },
            green: FbBitfield { offset: 8, length: 8, msb_right: 0 },
            blue: FbBitfield { offset: 0, length: 8, msb_right: 0 },
        }
    }

    /// Pack a color into its native-endian pixel value
    pub fn pack(&self, color: Rgb888) -> u32 {
        channel(color.r(), &self.red)
            | channel(color.g(), &self.green)
            | channel(color.b(), &self.blue)
    }

    /// Write one pixel at the start of `out`
    fn write(&self, color: Rgb888, out: &mut [u8]) {
        let value = self.pack(color).to_ne_bytes();
        // 24 bpp keeps the low three bytes of the little-endian value
        #[cfg(target_endian = "little")]
        out[..self.bytes].copy_from_slice(&value[..self.bytes]);
        #[cfg(target_endian = "big")]
        out[..self.bytes].copy_from_slice(&value[4 - self.bytes..]);
    }
}

fn channel(value: u8, field: &FbBitfield) -> u32 {
    let length = field.length.min(8);
    if length == 0 {
        return 0;
    }
    (u32::from(value) >> (8 - length)) << field.offset
}

/// Geometry of the physical display memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Visible resolution, before rotation
    pub physical: Size,
    /// Bytes per scanline
    pub line_length: usize,
    pub format: PixelFormat,
    pub rotation: Rotation,
}

impl Geometry {
    /// Bytes in one page
    pub fn page_len(&self) -> usize {
        self.line_length * self.physical.height as usize
    }

    /// Logical size seen by the canvas
    pub fn logical(&self) -> Size {
        self.rotation.logical_size(self.physical)
    }
}

/// Copy a logical region of the canvas into one page of display memory
pub fn blit(canvas: &Canvas, region: &Rectangle, geometry: &Geometry, page: &mut [u8]) {
    let region = region.intersection(&canvas.bounding_box());
    let bytes = geometry.format.bytes;

    for point in region.points() {
        let Some(color) = canvas.pixel(point) else {
            continue;
        };
        let target = geometry.rotation.to_physical(point, geometry.physical);
        let offset = target.y as usize * geometry.line_length + target.x as usize * bytes;
        if let Some(out) = page.get_mut(offset..offset + bytes) {
            geometry.format.write(color, out);
        }
    }
}

/// Which page is on screen and what each page still lacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pages {
    /// 2 when panning is available, else 1
    count: usize,
    /// Page currently scanned out
    shown: usize,
    /// Region each page is missing relative to the canvas
    pending: [Option<Rectangle>; 2],
}

impl Pages {
    /// Bookkeeping for `count` pages (1 or 2) with `shown` on screen
    pub fn new(count: usize, shown: usize) -> Self {
        let count = count.clamp(1, 2);
        Self {
            count,
            shown: shown % count,
            pending: [None, None],
        }
    }

    /// Number of pages
    pub fn count(&self) -> usize {
        self.count
    }

    /// Page currently scanned out
    pub fn shown(&self) -> usize {
        self.shown
    }

    /// Record that `page` is now on screen
    pub fn show(&mut self, page: usize) {
        self.shown = page % self.count;
    }

    /// Bring the next page up to date in `memory`
    ///
    /// `memory` holds the pages back to back. With one page the update is
    /// written in place and `None` is returned. With two, the hidden page
    /// receives `region` plus whatever it missed while it was on screen,
    /// and its index is returned for panning.
    pub fn update(
        &mut self,
        canvas: &Canvas,
        region: Option<Rectangle>,
        full_sync: bool,
        geometry: &Geometry,
        memory: &mut [u8],
    ) -> Option<usize> {
        let everything = canvas.bounding_box();
        let len = geometry.page_len();

        if self.count == 1 {
            let area = if full_sync { Some(everything) } else { region };
            if let Some(area) = area {
                blit(canvas, &area, geometry, page_mut(memory, len, 0));
            }
            return None;
        }

        let back = 1 - self.shown;
        if full_sync {
            for index in 0..2 {
                blit(canvas, &everything, geometry, page_mut(memory, len, index));
            }
            self.pending = [None, None];
            return Some(back);
        }

        let stale = self.pending[back].take();
        let area = match (stale, region) {
            (Some(a), Some(b)) => Some(envelope(&a, &b)),
            (a, b) => a.or(b),
        };
        if let Some(area) = area {
            blit(canvas, &area, geometry, page_mut(memory, len, back));
        }
        if let Some(region) = region {
            let front = &mut self.pending[self.shown];
            *front = Some(match *front {
                Some(prev) => envelope(&prev, &region),
                None => region,
            });
        }
        Some(back)
    }
}

fn page_mut(memory: &mut [u8], len: usize, index: usize) -> &mut [u8] {
    &mut memory[index * len..(index + 1) * len]
}

/// A mapped Linux framebuffer device
pub struct Framebuffer {
    file: File,
    map: MmapMut,
    var: FbVarScreenInfo,
    geometry: Geometry,
    pages: Pages,
}

impl Framebuffer {
    /// Open and map framebuffer `path`
    pub fn open(path: &Path, rotation: Rotation) -> Result<Self, FbError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| FbError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        let fd = file.as_raw_fd();

        let mut var = FbVarScreenInfo::default();
        // SAFETY: `var` is a correctly laid out fb_var_screeninfo
        unsafe { ioctl::get_vscreeninfo(fd, &mut var) }.map_err(|source| FbError::Ioctl {
            request: "FBIOGET_VSCREENINFO",
            source,
        })?;

        // Ask for room for a second page
        if var.yres_virtual < var.yres * 2 {
            let mut wanted = var;
            wanted.yres_virtual = var.yres * 2;
            wanted.activate = ACTIVATE_NOW;
            // SAFETY: as above
            match unsafe { ioctl::put_vscreeninfo(fd, &wanted) } {
                Ok(_) => {
                    // SAFETY: as above
                    unsafe { ioctl::get_vscreeninfo(fd, &mut var) }.map_err(|source| {
                        FbError::Ioctl {
                            request: "FBIOGET_VSCREENINFO",
                            source,
                        }
                    })?;
                }
                Err(e) => debug!("no virtual resolution for double buffering: {}", e),
            }
        }

        let mut fix = FbFixScreenInfo::default();
        // SAFETY: `fix` is a correctly laid out fb_fix_screeninfo
        unsafe { ioctl::get_fscreeninfo(fd, &mut fix) }.map_err(|source| FbError::Ioctl {
            request: "FBIOGET_FSCREENINFO",
            source,
        })?;

        let format = PixelFormat::from_var(&var, fix.visual)?;
        let geometry = Geometry {
            physical: Size::new(var.xres, var.yres),
            line_length: fix.line_length as usize,
            format,
            rotation,
        };

        let pages = if var.yres_virtual >= var.yres * 2 { 2 } else { 1 };
        let needed = geometry.page_len() * pages;
        let available = fix.smem_len as usize;
        let pages = if needed > available && pages == 2 {
            warn!("framebuffer memory too small for two pages, using one");
            1
        } else {
            pages
        };
        if geometry.page_len() > available {
            return Err(FbError::TooSmall {
                needed: geometry.page_len(),
                available,
            });
        }

        // SAFETY: the mapping is private to this process and only accessed
        // through `self.map` while the device stays open
        let map =
            unsafe { MmapOptions::new().len(available).map_mut(&file) }.map_err(FbError::Map)?;

        info!(
            "framebuffer {}: {}x{} {} bpp, {} page(s), rotation {}",
            path.display(),
            var.xres,
            var.yres,
            var.bits_per_pixel,
            pages,
            rotation.degrees()
        );

        let shown = (var.yoffset / var.yres.max(1)) as usize;
        Ok(Self {
            file,
            map,
            var,
            geometry,
            pages: Pages::new(pages, shown),
        })
    }

    /// Display memory geometry
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Returns true if updates are double-buffered
    pub fn is_double_buffered(&self) -> bool {
        self.pages.count() == 2
    }

    fn pan_to(&mut self, page: usize) -> Result<(), FbError> {
        self.var.xoffset = 0;
        self.var.yoffset = page as u32 * self.var.yres;
        // SAFETY: `var` is a correctly laid out fb_var_screeninfo
        unsafe { ioctl::pan_display(self.file.as_raw_fd(), &self.var) }.map_err(|source| {
            FbError::Ioctl {
                request: "FBIOPAN_DISPLAY",
                source,
            }
        })?;
        self.pages.show(page);
        Ok(())
    }
}

impl Panel for Framebuffer {
    type Error = FbError;

    fn size(&self) -> Size {
        self.geometry.logical()
    }

    fn present(
        &mut self,
        canvas: &Canvas,
        region: Option<Rectangle>,
        full_sync: bool,
    ) -> Result<(), Self::Error> {
        let geometry = self.geometry;
        match self
            .pages
            .update(canvas, region, full_sync, &geometry, &mut self.map)
        {
            Some(page) => self.pan_to(page),
            None => Ok(()),
        }
    }
}
