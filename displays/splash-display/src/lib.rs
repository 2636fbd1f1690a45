//! Rendering surface and screen logic for the splash daemon
//!
//! This crate provides:
//! - `Surface` trait, the drawing contract the dispatcher renders through
//! - `Canvas`, the in-memory working buffer every draw lands in
//! - `Panel` trait for committing the working buffer to a physical display
//! - RLE image decoding for the logo and bar artwork
//! - `Layout`, the split-line geometry of the scene
//! - `Dispatcher`, which projects pipe commands onto the surface
//!
//! # Architecture
//!
//! ```text
//!   Command ──▶ Dispatcher ──▶ Surface (BufferedSurface)
//!                                 │  draw_*  ▶ Canvas (working buffer)
//!                                 │  flip    ▶ Panel  (framebuffer pages)
//! ```
//!
//! Drawing never fails; only committing to the panel can.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod canvas;
pub mod dispatch;
pub mod font;
pub mod layout;
pub mod panel;
pub mod rle;
pub mod scene;
pub mod surface;

// Re-export key types
pub use canvas::Canvas;
pub use dispatch::{Dispatcher, FlipPolicy, Outcome, Status};
pub use layout::Layout;
pub use panel::{FlipRecord, MemoryPanel, Panel, Rotation};
pub use rle::{Image, ImageError};
pub use scene::{Palette, Scene};
pub use surface::{BufferedSurface, Surface};

pub use embedded_graphics::mono_font::MonoFont;
pub use embedded_graphics::pixelcolor::Rgb888;
pub use embedded_graphics::prelude::{Point, Size};
pub use embedded_graphics::primitives::Rectangle;
