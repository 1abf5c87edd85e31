// SPDX-License-Identifier: MIT

//! Blocking control-socket client. One process, one request, one
//! response — no reason to pull an async runtime into the CLI for
//! that. Request is a `\n`-terminated line; response is
//! `[exit_code] body… [0x00]`.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::time::{Duration, Instant};

use crate::exit_error::ExitError;

pub struct DaemonClient {
    stream: UnixStream,
}

impl DaemonClient {
    pub fn connect() -> Result<Self, ExitError> {
        let path = crate::env::socket_path();
        UnixStream::connect(&path)
            .map(|stream| Self { stream })
            .map_err(|e| ExitError::fatal(format!("daemon not running ({e})")))
    }

    /// Connect, spawning the daemon and polling its socket for up to
    /// 1 s if nothing answered on the first try.
    pub fn connect_or_start() -> Result<Self, ExitError> {
        if let Ok(client) = Self::connect() {
            return Ok(client);
        }
        crate::daemon_process::spawn_daemon()?;
        let deadline = Instant::now() + Duration::from_secs(1);
        loop {
            if let Ok(client) = Self::connect() {
                return Ok(client);
            }
            if Instant::now() >= deadline {
                return Err(ExitError::fatal("daemon did not start within 1s"));
            }
            std::thread::sleep(Duration::from_millis(25));
        }
    }

    /// Send one command line and return `(exit_code, body)`.
    pub fn send_line(&mut self, line: &str) -> Result<(u8, String), ExitError> {
        self.stream
            .set_read_timeout(Some(crate::env::ipc_timeout()))
            .map_err(|e| ExitError::fatal(e.to_string()))?;
        self.stream
            .write_all(format!("{line}\n").as_bytes())
            .map_err(|e| ExitError::fatal(format!("failed to send command: {e}")))?;

        let exit_code = read_byte(&mut self.stream)?;
        let mut body = Vec::new();
        loop {
            let byte = read_byte(&mut self.stream)?;
            if byte == 0 {
                break;
            }
            body.push(byte);
        }
        Ok((exit_code, String::from_utf8_lossy(&body).into_owned()))
    }
}

fn read_byte(stream: &mut UnixStream) -> Result<u8, ExitError> {
    let mut byte = [0u8; 1];
    stream
        .read_exact(&mut byte)
        .map_err(|e| ExitError::fatal(format!("daemon connection dropped: {e}")))?;
    Ok(byte[0])
}
