//! Daemon errors

use nix::errno::Errno;
use splash_hal_linux::{FbError, FifoError};

use crate::config::ConfigError;

/// Anything that ends the daemon with a failure status
#[derive(Debug, thiserror::Error)]
pub enum SplashError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to install signal handlers: {0}")]
    Signals(#[from] Errno),

    #[error(transparent)]
    Fifo(#[from] FifoError),

    #[error(transparent)]
    Framebuffer(#[from] FbError),

    #[error("waiting on the pipe failed: {0}")]
    Wait(FifoError),

    #[error("reopening the pipe failed: {0}")]
    Reopen(FifoError),
}

impl SplashError {
    /// Process exit status
    pub fn exit_code(&self) -> u8 {
        match self {
            SplashError::Config(_) => 2,
            SplashError::Signals(_) | SplashError::Fifo(_) | SplashError::Framebuffer(_) => 3,
            SplashError::Wait(_) | SplashError::Reopen(_) => 4,
        }
    }
}
