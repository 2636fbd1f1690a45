//! Console mode switching
//!
//! While the splash owns the framebuffer the kernel console must not draw
//! over it. The console is switched to graphics mode on a spare virtual
//! terminal at startup and restored on exit.

/// Console controller
pub trait Console {
    /// Error type for console operations
    type Error;

    /// Activate a free virtual terminal and put it in graphics mode
    fn switch_to_graphics(&mut self) -> Result<(), Self::Error>;

    /// Return to text mode and the previously active terminal
    ///
    /// Must be harmless when called without a prior switch.
    fn restore(&mut self) -> Result<(), Self::Error>;
}

/// Console that is left alone (`--no-console-switch`)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConsole;

impl Console for NoConsole {
    type Error = core::convert::Infallible;

    fn switch_to_graphics(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn restore(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
