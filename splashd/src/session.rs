//! Session teardown
//!
//! Everything acquired at startup is registered here as it comes up.
//! Teardown releases the display, unlinks the pipe and then restores the
//! console, each at most once, whether it runs explicitly or on drop.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use splash_hal::Console;
use splash_hal_linux::fifo;
use tracing::{debug, warn};

/// Resources held for the lifetime of the splash
pub struct Session<D, C>
where
    C: Console,
    C::Error: Debug,
{
    display: Option<D>,
    fifo: Option<PathBuf>,
    console: Option<C>,
}

impl<D, C> Session<D, C>
where
    C: Console,
    C::Error: Debug,
{
    /// Empty session
    pub fn new() -> Self {
        Self {
            display: None,
            fifo: None,
            console: None,
        }
    }

    /// Unlink `path` on teardown
    pub fn register_fifo(&mut self, path: &Path) {
        self.fifo = Some(path.to_path_buf());
    }

    /// Switch `console` to graphics mode and restore it on teardown
    ///
    /// A failed switch is logged; the splash carries on regardless.
    pub fn switch_console(&mut self, mut console: C) {
        if let Err(e) = console.switch_to_graphics() {
            warn!("Console switch failed: {:?}", e);
        }
        self.console = Some(console);
    }

    /// Hold the display until teardown and lend it back
    pub fn attach_display(&mut self, display: D) -> &mut D {
        self.display.insert(display)
    }

    /// Release everything in order
    pub fn teardown(&mut self) {
        if self.display.take().is_some() {
            debug!("Display released");
        }

        if let Some(path) = self.fifo.take() {
            match fifo::remove(&path) {
                Ok(()) => debug!("Removed pipe {}", path.display()),
                Err(e) => warn!("{}", e),
            }
        }

        if let Some(mut console) = self.console.take() {
            match console.restore() {
                Ok(()) => debug!("Console restored"),
                Err(e) => warn!("Console restore failed: {:?}", e),
            }
        }
    }
}

impl<D, C> Default for Session<D, C>
where
    C: Console,
    C::Error: Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<D, C> Drop for Session<D, C>
where
    C: Console,
    C::Error: Debug,
{
    fn drop(&mut self) {
        self.teardown();
    }
}
