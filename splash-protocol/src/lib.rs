//! Splash Pipe Protocol
//!
//! This crate defines the line protocol spoken over the splash named pipe.
//! Boot scripts write newline-terminated ASCII commands; the daemon frames
//! them out of an unreliable byte stream and turns each line into a
//! [`Command`].
//!
//! # Protocol Overview
//!
//! ```text
//! MSG <text>\n            replace the status message
//! PROGRESS <integer>\n    set the progress bar (-100..=100, sign = direction)
//! QUIT\n                  stop the daemon
//! ```
//!
//! Anything else is accepted and ignored. Writes may be split or merged
//! arbitrarily by the pipe; framing never depends on read boundaries.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod command;
pub mod frame;

pub use command::Command;
pub use frame::{next_line, Drain, Fill, Framed, LineBuffer, LINE_BUFFER_SIZE};
