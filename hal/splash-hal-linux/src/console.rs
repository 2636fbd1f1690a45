//! Virtual terminal console switching
//!
//! At startup a free VT is activated and put into graphics mode so the
//! kernel console does not draw over the splash. On exit the VT goes back to
//! text mode and the previously active VT is restored.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;

use nix::errno::Errno;
use nix::libc::c_int;
use splash_hal::Console;
use tracing::{debug, info};

/// Virtual terminal and keyboard ioctls
mod ioctl {
    use super::VtStat;
    use nix::libc::c_int;

    nix::ioctl_read_bad!(vt_openqry, 0x5600, c_int);
    nix::ioctl_read_bad!(vt_getstate, 0x5603, VtStat);
    nix::ioctl_write_int_bad!(vt_activate, 0x5606);
    nix::ioctl_write_int_bad!(vt_waitactive, 0x5607);
    nix::ioctl_write_int_bad!(kd_setmode, 0x4B3A);
}

/// Console control device
const TTY0: &str = "/dev/tty0";

/// `KD_TEXT`
const KD_TEXT: c_int = 0;

/// `KD_GRAPHICS`
const KD_GRAPHICS: c_int = 1;

/// `struct vt_stat`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct VtStat {
    pub v_active: u16,
    pub v_signal: u16,
    pub v_state: u16,
}

/// Errors from console switching
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("failed to open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("{request} failed: {source}")]
    Ioctl {
        request: &'static str,
        source: Errno,
    },
}

fn ioctl_error(request: &'static str) -> impl FnOnce(Errno) -> ConsoleError {
    move |source| ConsoleError::Ioctl { request, source }
}

fn open_tty(path: PathBuf) -> Result<File, ConsoleError> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(nix::libc::O_NDELAY)
        .open(&path)
        .map_err(|source| ConsoleError::Open { path, source })
}

/// State saved by a switch, needed to undo it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Switched {
    /// VT the splash switched to
    vt: c_int,
    /// VT active before the switch
    original: c_int,
}

/// Linux VT console
#[derive(Debug, Default)]
pub struct VtConsole {
    switched: Option<Switched>,
}

impl VtConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// VT in graphics mode, if a switch happened
    pub fn active_vt(&self) -> Option<i32> {
        self.switched.map(|s| s.vt)
    }
}

impl Console for VtConsole {
    type Error = ConsoleError;

    fn switch_to_graphics(&mut self) -> Result<(), Self::Error> {
        let control = open_tty(PathBuf::from(TTY0))?;
        let fd = control.as_raw_fd();

        let mut vt: c_int = 0;
        // SAFETY: VT_OPENQRY writes one int
        unsafe { ioctl::vt_openqry(fd, &mut vt) }.map_err(ioctl_error("VT_OPENQRY"))?;

        let mut state = VtStat::default();
        // SAFETY: `state` is a correctly laid out vt_stat
        unsafe { ioctl::vt_getstate(fd, &mut state) }.map_err(ioctl_error("VT_GETSTATE"))?;
        drop(control);

        let tty = open_tty(PathBuf::from(format!("/dev/tty{vt}")))?;
        let fd = tty.as_raw_fd();
        // SAFETY: integer arguments only
        unsafe {
            ioctl::vt_activate(fd, vt).map_err(ioctl_error("VT_ACTIVATE"))?;
            ioctl::vt_waitactive(fd, vt).map_err(ioctl_error("VT_WAITACTIVE"))?;
            ioctl::kd_setmode(fd, KD_GRAPHICS).map_err(ioctl_error("KDSETMODE"))?;
        }

        self.switched = Some(Switched {
            vt,
            original: c_int::from(state.v_active),
        });
        info!("switched to vt{} (was vt{})", vt, state.v_active);
        Ok(())
    }

    fn restore(&mut self) -> Result<(), Self::Error> {
        let Some(switched) = self.switched.take() else {
            return Ok(());
        };

        let tty = open_tty(PathBuf::from(format!("/dev/tty{}", switched.vt)))?;
        let fd = tty.as_raw_fd();
        // SAFETY: integer arguments only
        unsafe {
            ioctl::kd_setmode(fd, KD_TEXT).map_err(ioctl_error("KDSETMODE"))?;
            ioctl::vt_activate(fd, switched.original).map_err(ioctl_error("VT_ACTIVATE"))?;
            ioctl::vt_waitactive(fd, switched.original).map_err(ioctl_error("VT_WAITACTIVE"))?;
        }

        debug!("restored vt{}", switched.original);
        Ok(())
    }
}
