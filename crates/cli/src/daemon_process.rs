// SPDX-License-Identifier: MIT

//! Background daemon spawn: a CLI that finds no daemon running forks,
//! calls `setsid`, and execs into the `socketleyd` binary from the
//! freshly-detached child; the parent polls the control socket for up
//! to 1 s waiting for it to come up.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use crate::exit_error::ExitError;

/// Locate the `socketleyd` binary: next to the running CLI binary
/// first (the common installed layout), else `PATH`.
fn find_daemon_binary() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("socketleyd");
            if sibling.exists() {
                return sibling;
            }
        }
    }
    PathBuf::from("socketleyd")
}

/// Fork, detach into a new session, and exec `socketleyd` in the
/// child. Returns once the fork succeeds; the parent does not wait for
/// the daemon to finish starting up (the caller polls the socket).
pub fn spawn_daemon() -> Result<(), ExitError> {
    let binary = find_daemon_binary();
    let path = CString::new(binary.as_os_str().as_bytes())
        .map_err(|_| ExitError::fatal("daemon binary path contains a NUL byte"))?;
    let argv = [path.as_ptr(), std::ptr::null()];

    // SAFETY: between fork() and execv()/_exit() the child only calls
    // async-signal-safe libc functions, per the usual fork-then-exec
    // discipline — no allocation, no locking, no Rust runtime state.
    let pid = unsafe { libc::fork() };
    match pid {
        -1 => Err(ExitError::fatal(std::io::Error::last_os_error().to_string())),
        0 => {
            unsafe {
                libc::setsid();
                libc::execv(path.as_ptr(), argv.as_ptr());
                // execv only returns on failure.
                libc::_exit(127);
            }
        }
        _ => Ok(()),
    }
}

/// Read the pid the daemon recorded in its lock file (see
/// `sk-daemon`'s `lifecycle::acquire_lock`).
pub fn read_daemon_pid() -> Option<i32> {
    let path = crate::env::state_dir().join("daemon.pid");
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Send `SIGTERM` to the daemon pid, if one is recorded and the
/// process is actually alive.
pub fn signal_daemon(sig: i32) -> bool {
    match read_daemon_pid() {
        Some(pid) if unsafe { libc::kill(pid, 0) } == 0 => unsafe { libc::kill(pid, sig) == 0 },
        _ => false,
    }
}

#[cfg(test)]
#[path = "daemon_process_tests.rs"]
mod tests;
