// SPDX-License-Identifier: MIT

//! Centralized environment variable access for the daemon crate:
//! state/cluster directory resolution, the control socket path for
//! system vs. user mode, and the opt-in TCP control listener.

use std::path::PathBuf;
use std::time::Duration;

const APP: &str = "socketley";

/// Base state directory: `SOCKETLEY_STATE_DIR` > system path (if
/// running as root) > `$XDG_DATA_HOME`/user fallback. The
/// `<app>/runtimes/` persistence path is one level below this —
/// `lifecycle::Config` appends that subdirectory itself, since this
/// base also holds the daemon lock file and logs.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SOCKETLEY_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if running_as_root() {
        return PathBuf::from("/var/lib").join(APP);
    }
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join(APP)
}

/// Control socket path: `/run/<app>/<app>.sock` when system-installed
/// and privileged; else `/tmp/<app>.sock` or a per-user XDG path.
pub fn socket_path() -> PathBuf {
    if let Ok(path) = std::env::var("SOCKETLEY_SOCKET_PATH") {
        return PathBuf::from(path);
    }
    if running_as_root() {
        let run_dir = PathBuf::from("/run").join(APP);
        return run_dir.join(format!("{APP}.sock"));
    }
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(format!("{APP}-{}.sock", unsafe { libc::getuid() }))
}

/// Shared cluster directory. Unset disables the cluster publisher
/// entirely.
pub fn cluster_dir() -> Option<PathBuf> {
    std::env::var("SOCKETLEY_CLUSTER_DIR").ok().map(PathBuf::from)
}

/// Optional TCP port for remote control-socket connections, alongside
/// the Unix socket.
pub fn tcp_port() -> Option<u16> {
    std::env::var("SOCKETLEY_TCP_PORT").ok().and_then(|s| s.parse::<u16>().ok())
}

/// Auth token gating the TCP control listener. Required whenever
/// `tcp_port()` is set; connections presenting no/incorrect token are
/// dropped before any command is parsed.
pub fn auth_token() -> Option<String> {
    std::env::var("SOCKETLEY_AUTH_TOKEN").ok().filter(|s| !s.is_empty())
}

pub fn ipc_timeout() -> Duration {
    std::env::var("SOCKETLEY_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

pub fn drain_timeout() -> Duration {
    std::env::var("SOCKETLEY_DRAIN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

pub fn queue_depth() -> Option<u32> {
    std::env::var("SOCKETLEY_QUEUE_DEPTH").ok().and_then(|s| s.parse::<u32>().ok())
}

/// Build switch disabling TLS envelope setup.
pub fn no_tls() -> bool {
    std::env::var_os("SOCKETLEY_NO_TLS").is_some()
}

/// Build switch disabling script/extension-VM loading (`APP_NO_LUA`).
pub fn no_lua() -> bool {
    std::env::var_os("SOCKETLEY_NO_LUA").is_some()
}

fn running_as_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
