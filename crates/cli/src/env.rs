// SPDX-License-Identifier: MIT

//! Path resolution the CLI needs to find the daemon it's talking to.
//! Mirrors `sk-daemon`'s `env` module exactly — duplicated rather than
//! shared because the two binaries have no common crate to hang it
//! from and the daemon crate is a `bin`-only target.

use std::path::PathBuf;
use std::time::Duration;

const APP: &str = "socketley";

pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SOCKETLEY_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if running_as_root() {
        return PathBuf::from("/var/lib").join(APP);
    }
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join(APP)
}

pub fn socket_path() -> PathBuf {
    if let Ok(path) = std::env::var("SOCKETLEY_SOCKET_PATH") {
        return PathBuf::from(path);
    }
    if running_as_root() {
        return PathBuf::from("/run").join(APP).join(format!("{APP}.sock"));
    }
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(format!("{APP}-{}.sock", unsafe { libc::getuid() }))
}

pub fn ipc_timeout() -> Duration {
    std::env::var("SOCKETLEY_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

fn running_as_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
