// SPDX-License-Identifier: MIT

//! The signal-interrupt self-pipe. `request_stop()` writes one byte to
//! the write end; the read end is kept permanently submitted so the
//! byte surfaces as an ordinary completion the run loop recognizes by
//! its sentinel token, rather than needing a signal handler on the
//! reactor thread.

use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::unistd::pipe;

use crate::error::{ReactorError, Result};

pub struct SignalPipe {
    read: OwnedFd,
    write: OwnedFd,
}

impl SignalPipe {
    pub fn new() -> Result<Self> {
        let (read, write) = pipe().map_err(|e| ReactorError::Signal(e.into()))?;
        set_nonblocking(read.as_raw_fd()).map_err(|e| ReactorError::Signal(e.into()))?;
        Ok(Self { read, write })
    }

    pub fn read_fd(&self) -> RawFd {
        self.read.as_raw_fd()
    }

    /// Wake the reactor out of `submit_and_wait`. Called from
    /// `request_stop()` and from the daemon's SIGTERM/SIGINT handler.
    pub fn wake(&self) -> Result<()> {
        let byte = [1u8];
        // EAGAIN means a wake is already pending, which is fine.
        match nix::unistd::write(&self.write, &byte) {
            Ok(_) | Err(nix::errno::Errno::EAGAIN) => Ok(()),
            Err(e) => Err(ReactorError::Signal(e.into())),
        }
    }
}

fn set_nonblocking(fd: RawFd) -> std::result::Result<(), nix::errno::Errno> {
    let flags = fcntl(fd, FcntlArg::F_GETFL)?;
    let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
    fcntl(fd, FcntlArg::F_SETFL(flags))?;
    Ok(())
}
