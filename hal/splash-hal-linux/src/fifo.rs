//! Named pipe command source
//!
//! The pipe is created with mode 0660 and opened read-only and
//! non-blocking, so the daemon never stalls in `open` waiting for a writer.
//! When the last writer closes, poll keeps reporting a hang-up until the
//! descriptor is replaced, which is what [`Fifo::reopen`] is for.
//!
//! Callers that keep their termination signals blocked hand the mask to
//! unblock during the wait to [`Fifo::wake_on`]. The wait then uses `ppoll`,
//! so a signal that arrived before the wait still interrupts it.

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::fd::AsFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::errno::Errno;
use nix::poll::{poll, ppoll, PollFd, PollFlags, PollTimeout};
use nix::sys::signal::SigSet;
use nix::sys::stat::Mode;
use nix::sys::time::TimeSpec;
use nix::unistd::mkfifo;
use splash_hal::{CommandPipe, ReadError, WaitOutcome};
use tracing::{debug, info};

/// Default pipe name
pub const FIFO_NAME: &str = "psplash_fifo";

/// Default directory for the pipe
pub const FIFO_DIR: &str = "/run";

/// Environment variable overriding the pipe directory
pub const FIFO_DIR_ENV: &str = "PSPLASH_FIFO_DIR";

/// Permissions of a newly created pipe
const FIFO_MODE: u32 = 0o660;

/// Errors from pipe operations
#[derive(Debug, thiserror::Error)]
pub enum FifoError {
    #[error("failed to create pipe {path}: {source}")]
    Create { path: PathBuf, source: Errno },

    #[error("failed to open pipe {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("failed to remove pipe {path}: {source}")]
    Remove { path: PathBuf, source: io::Error },

    #[error("poll failed: {0}")]
    Poll(Errno),

    #[error("read failed: {0}")]
    Read(io::Error),
}

/// A named pipe opened for non-blocking reads
#[derive(Debug)]
pub struct Fifo {
    path: PathBuf,
    file: File,
    /// Signal mask in effect while waiting
    wake_mask: Option<SigSet>,
}

impl Fifo {
    /// Create the pipe if needed and open it
    ///
    /// An existing pipe at `path` is reused.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, FifoError> {
        let path = path.into();

        match mkfifo(path.as_path(), Mode::from_bits_truncate(FIFO_MODE)) {
            Ok(()) => info!("created pipe {}", path.display()),
            Err(Errno::EEXIST) => debug!("reusing pipe {}", path.display()),
            Err(source) => return Err(FifoError::Create { path, source }),
        }

        let file = open_nonblocking(&path)?;
        Ok(Self {
            path,
            file,
            wake_mask: None,
        })
    }

    /// Wait with `mask` as the signal mask
    ///
    /// Signals blocked everywhere else but not in `mask` interrupt the
    /// wait, including ones already pending when it starts.
    pub fn wake_on(&mut self, mask: SigSet) {
        self.wake_mask = Some(mask);
    }

    /// Location of the pipe
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Unlink the pipe at `path`
///
/// Open descriptors stay usable; only the name goes away.
pub fn remove(path: &Path) -> Result<(), FifoError> {
    std::fs::remove_file(path).map_err(|source| FifoError::Remove {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve the pipe location for a pipe `name`
///
/// The directory comes from `PSPLASH_FIFO_DIR` if set, then from
/// `configured`, then [`FIFO_DIR`].
pub fn fifo_path(configured: Option<&Path>, name: &str) -> PathBuf {
    let env = std::env::var_os(FIFO_DIR_ENV).map(PathBuf::from);
    fifo_dir(env, configured).join(name)
}

fn fifo_dir(env: Option<PathBuf>, configured: Option<&Path>) -> PathBuf {
    env.or_else(|| configured.map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from(FIFO_DIR))
}

fn open_nonblocking(path: &Path) -> Result<File, FifoError> {
    OpenOptions::new()
        .read(true)
        .custom_flags(nix::libc::O_NONBLOCK)
        .open(path)
        .map_err(|source| FifoError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// Poll timeout for an optional duration, saturating at the largest value
fn poll_timeout(timeout: Option<Duration>) -> PollTimeout {
    match timeout {
        None => PollTimeout::NONE,
        Some(timeout) => {
            let millis = timeout.as_millis().min(i32::MAX as u128) as i32;
            PollTimeout::try_from(millis).unwrap_or(PollTimeout::MAX)
        }
    }
}

/// `ppoll` timeout for an optional duration, capped like [`poll_timeout`]
fn ppoll_timeout(timeout: Option<Duration>) -> Option<TimeSpec> {
    let cap = Duration::from_millis(i32::MAX as u64);
    timeout.map(|timeout| TimeSpec::from(timeout.min(cap)))
}

impl CommandPipe for Fifo {
    type Error = FifoError;

    fn wait(&mut self, timeout: Option<Duration>) -> WaitOutcome<Self::Error> {
        let mut fds = [PollFd::new(self.file.as_fd(), PollFlags::POLLIN)];
        let polled = match self.wake_mask {
            Some(mask) => ppoll(&mut fds, ppoll_timeout(timeout), Some(mask)),
            None => poll(&mut fds, poll_timeout(timeout)),
        };
        match polled {
            Ok(0) => WaitOutcome::TimedOut,
            Ok(_) => WaitOutcome::Ready,
            Err(Errno::EINTR) => WaitOutcome::Interrupted,
            Err(e) => WaitOutcome::Failed(FifoError::Poll(e)),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ReadError<Self::Error>> {
        match self.file.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(ReadError::WouldBlock),
            Err(e) => Err(ReadError::Io(FifoError::Read(e))),
        }
    }

    fn reopen(&mut self) -> Result<(), Self::Error> {
        // Open first so a failure keeps the old descriptor usable
        self.file = open_nonblocking(&self.path)?;
        debug!("reopened pipe {}", self.path.display());
        Ok(())
    }
}
