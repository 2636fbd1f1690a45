//! Linux HAL for the splash daemon
//!
//! Implements the `splash-hal` and `splash-display` platform traits on top
//! of Linux device interfaces:
//!
//! - Named pipe command source with poll-based waits
//! - Framebuffer panel with optional double-buffered panning
//! - VT console switching
//! - Service manager readiness notification

pub mod console;
pub mod fbdev;
pub mod fifo;
pub mod notify;

pub use console::{ConsoleError, VtConsole};
pub use fbdev::{fb_path, FbError, Framebuffer};
pub use fifo::{fifo_path, Fifo, FifoError};
pub use notify::notify_ready;
