//! Service manager readiness notification
//!
//! Sends `READY=1` to the datagram socket named by `$NOTIFY_SOCKET`, as
//! systemd expects from `Type=notify` services. Without the variable this is
//! a no-op.

use std::io;
use std::os::unix::net::UnixDatagram;
use std::path::Path;

use tracing::debug;

/// Environment variable naming the notification socket
pub const NOTIFY_SOCKET_ENV: &str = "NOTIFY_SOCKET";

/// Report readiness to the service manager
///
/// Returns `Ok(false)` when no service manager asked to be notified.
pub fn notify_ready() -> io::Result<bool> {
    match std::env::var_os(NOTIFY_SOCKET_ENV) {
        Some(socket) => {
            send(Path::new(&socket), b"READY=1")?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Send one notification datagram to `socket`
///
/// A leading `@` selects the abstract socket namespace.
pub fn send(socket: &Path, message: &[u8]) -> io::Result<()> {
    let sock = UnixDatagram::unbound()?;

    let name = socket.as_os_str().as_encoded_bytes();
    if let Some(abstract_name) = name.strip_prefix(b"@") {
        use std::os::linux::net::SocketAddrExt;
        use std::os::unix::net::SocketAddr;

        let addr = SocketAddr::from_abstract_name(abstract_name)?;
        sock.send_to_addr(message, &addr)?;
    } else {
        sock.send_to(message, socket)?;
    }

    debug!("notified {}", socket.display());
    Ok(())
}
