//! Termination signals
//!
//! SIGHUP, SIGINT, SIGQUIT and SIGTERM raise a process-wide flag. The
//! signals stay blocked on the daemon thread and are only unblocked inside
//! the pipe wait, through the mask from [`Shutdown::wake_mask`]. A signal
//! that lands between the loop's flag check and the wait stays pending
//! until the wait starts, which it then interrupts with `EINTR`.

use std::sync::atomic::{AtomicBool, Ordering};

use nix::errno::Errno;
use nix::libc::c_int;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal};
use tracing::debug;

/// Signals that end the session
pub const SIGNALS: [Signal; 4] = [
    Signal::SIGHUP,
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGTERM,
];

static REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_signal(_: c_int) {
    REQUESTED.store(true, Ordering::SeqCst);
}

/// Installed termination handling
#[derive(Debug, Clone, Copy)]
pub struct Shutdown {
    wake_mask: SigSet,
}

impl Shutdown {
    /// Flag raised once a termination signal was handled
    pub fn flag(&self) -> &'static AtomicBool {
        &REQUESTED
    }

    /// Signal mask to wait with so termination signals get through
    pub fn wake_mask(&self) -> SigSet {
        self.wake_mask
    }
}

/// Block the termination signals on this thread and install their handlers
pub fn install() -> Result<Shutdown, Errno> {
    let blocked: SigSet = SIGNALS.into_iter().collect();
    let previous = blocked.thread_swap_mask(SigmaskHow::SIG_BLOCK)?;

    let action = SigAction::new(
        SigHandler::Handler(on_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for signal in SIGNALS {
        // SAFETY: the handler only stores to an atomic
        unsafe { sigaction(signal, &action) }?;
        debug!("Handler installed for {:?}", signal);
    }

    let mut wake_mask = previous;
    for signal in SIGNALS {
        wake_mask.remove(signal);
    }
    Ok(Shutdown { wake_mask })
}

#[cfg(test)]
pub(crate) fn reset() {
    REQUESTED.store(false, Ordering::SeqCst);
}
