//! Splash Platform Abstraction Layer
//!
//! This crate defines the traits the splash daemon needs from its platform.
//! The Linux implementation lives in `splash-hal-linux`; tests drive the
//! daemon through scripted implementations of the same traits.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (splashd)                  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  splash-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │ splash-hal-   │
//!             │    linux      │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`pipe::CommandPipe`] - Readable command pipe with timed waits
//! - [`console::Console`] - Text/graphics console mode switching

#![no_std]
#![deny(unsafe_code)]

pub mod console;
pub mod pipe;

// Re-export key traits at crate root for convenience
pub use console::{Console, NoConsole};
pub use pipe::{CommandPipe, ReadError, WaitOutcome};
