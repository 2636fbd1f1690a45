//! Command pipe abstraction
//!
//! The splash daemon reads its commands from a pipe that writers may open
//! and close at will. The pipe is non-blocking; the only place the daemon
//! suspends is [`CommandPipe::wait`].

use core::time::Duration;

/// Result of waiting for the pipe to become readable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome<E> {
    /// Data (or end of stream) is ready to be read
    Ready,
    /// The timeout elapsed with nothing to read
    TimedOut,
    /// The wait was interrupted by a signal
    Interrupted,
    /// The wait itself failed
    Failed(E),
}

impl<E> WaitOutcome<E> {
    /// Returns true if the pipe can be read
    pub fn is_ready(&self) -> bool {
        matches!(self, WaitOutcome::Ready)
    }
}

/// Errors from a non-blocking read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError<E> {
    /// Nothing to read right now
    WouldBlock,
    /// The read failed
    Io(E),
}

/// Command pipe
///
/// Implementations own one open descriptor at a time. `reopen` replaces it
/// with a fresh descriptor on the same pipe, which clears a hang-up left
/// behind by the last writer.
pub trait CommandPipe {
    /// Error type for pipe operations
    type Error;

    /// Block until the pipe is readable
    ///
    /// `None` waits indefinitely.
    fn wait(&mut self, timeout: Option<Duration>) -> WaitOutcome<Self::Error>;

    /// Read available bytes into `buf`
    ///
    /// Returns `Ok(0)` at end of stream (all writers closed).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ReadError<Self::Error>>;

    /// Close the current descriptor and open the pipe again
    fn reopen(&mut self) -> Result<(), Self::Error>;
}
