// SPDX-License-Identifier: MIT

//! Daemon lifecycle: paths, startup, graceful shutdown.

mod startup;

pub use startup::{startup, StartupResult};

use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use thiserror::Error;

/// Resolved filesystem layout for one daemon instance.
#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    pub runtimes_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub cluster_dir: Option<PathBuf>,
    pub queue_depth: Option<u32>,
}

impl Config {
    /// Resolve every path from the environment (state dir, control
    /// socket, cluster directory); creates the state and runtimes
    /// directories if absent.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = crate::env::state_dir();
        let runtimes_dir = state_dir.join("runtimes");
        std::fs::create_dir_all(&runtimes_dir).map_err(LifecycleError::Io)?;

        let socket_path = crate::env::socket_path();
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).map_err(LifecycleError::Io)?;
        }

        Ok(Self {
            lock_path: state_dir.join("daemon.pid"),
            cluster_dir: crate::env::cluster_dir(),
            queue_depth: crate::env::queue_depth(),
            runtimes_dir,
            state_dir,
            socket_path,
        })
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("another daemon instance is already running (lock held at {0:?})")]
    AlreadyRunning(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Reactor(#[from] sk_reactor::ReactorError),

    #[error(transparent)]
    Registry(#[from] sk_registry::RegistryError),
}

/// Acquire the daemon's exclusive lock file via `flock`, refusing to
/// start a second instance against the same state directory. Records
/// this process's pid in the file so the CLI can find it to send a
/// shutdown signal — there is no wire-level "stop the daemon" command,
/// only per-runtime ones.
pub fn acquire_lock(path: &PathBuf) -> Result<File, LifecycleError> {
    let mut file = OpenOptions::new().create(true).write(true).open(path).map_err(LifecycleError::Io)?;
    let fd = std::os::fd::AsRawFd::as_raw_fd(&file);
    // SAFETY: `fd` is a valid, open fd for the lifetime of this call.
    let rc = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
    if rc != 0 {
        return Err(LifecycleError::AlreadyRunning(path.clone()));
    }
    use std::io::{Seek, SeekFrom, Write};
    file.set_len(0).map_err(LifecycleError::Io)?;
    file.seek(SeekFrom::Start(0)).map_err(LifecycleError::Io)?;
    write!(file, "{}", std::process::id()).map_err(LifecycleError::Io)?;
    file.flush().map_err(LifecycleError::Io)?;
    Ok(file)
}
