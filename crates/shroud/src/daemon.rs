//! Detaching from the invoking process.

use std::io;

use tracing::debug;

/// Fork; the parent exits with status 0 and the child returns.
///
/// Call only while the process is single threaded. Everything opened before
/// the fork (display connection, PAM transaction) is used by the child.
pub fn daemonize() -> io::Result<()> {
    // SAFETY: no other threads exist, so the child's copy of the address
    // space is consistent.
    match unsafe { libc::fork() } {
        -1 => Err(io::Error::last_os_error()),
        0 => {
            debug!(pid = std::process::id(), "Running in background");
            Ok(())
        }
        _ => std::process::exit(0),
    }
}
