//! Shared harness: spins up an isolated `socketley`/`socketleyd` pair
//! (own state dir, own control socket) so specs never collide with
//! each other or a real system daemon, and drives them only through
//! the CLI the way an operator would.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::{Duration, Instant};

use assert_cmd::Command;

pub const SPEC_WAIT_MAX_MS: u64 = 5_000;

pub struct Harness {
    dir: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self { dir: tempfile::tempdir().expect("tempdir") }
    }

    pub fn state_dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn socket_path(&self) -> PathBuf {
        self.dir.path().join("daemon.sock")
    }

    /// A `socketley` invocation pre-wired to this harness's daemon;
    /// the first subcommand run auto-starts `socketleyd` (fork +
    /// setsid + exec, polled for up to 1s).
    pub fn cli(&self) -> Command {
        let mut cmd = Command::cargo_bin("socketley").expect("socketley binary built by the workspace");
        cmd.env("SOCKETLEY_STATE_DIR", self.state_dir());
        cmd.env("SOCKETLEY_SOCKET_PATH", self.socket_path());
        cmd
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = self.cli().args(["daemon", "stop"]).output();
    }
}

pub struct Captured {
    output: Output,
}

impl Captured {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout().contains(needle), "expected stdout to contain {needle:?}, got: {:?}", self.stdout());
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr().contains(needle), "expected stderr to contain {needle:?}, got: {:?}", self.stderr());
        self
    }
}

pub trait CommandExt {
    fn passes(&mut self) -> Captured;
    fn fails(&mut self) -> Captured;
}

impl CommandExt for Command {
    fn passes(&mut self) -> Captured {
        let output = self.output().expect("command should spawn");
        assert!(output.status.success(), "expected success, stderr: {}", String::from_utf8_lossy(&output.stderr));
        Captured { output }
    }

    fn fails(&mut self) -> Captured {
        let output = self.output().expect("command should spawn");
        assert!(!output.status.success(), "expected failure, stdout: {}", String::from_utf8_lossy(&output.stdout));
        Captured { output }
    }
}

/// Poll `cond` until it's true or `max_ms` elapses.
pub fn wait_for(max_ms: u64, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(25));
    }
}

/// Connect to `127.0.0.1:port` with a short retry loop — the runtime
/// may not have its listener armed the instant `start` returns.
pub fn connect_with_retry(port: u16, max_ms: u64) -> TcpStream {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    loop {
        match TcpStream::connect(("127.0.0.1", port)) {
            Ok(s) => return s,
            Err(e) if Instant::now() < deadline => {
                let _ = e;
                std::thread::sleep(Duration::from_millis(25));
            }
            Err(e) => panic!("could not connect to 127.0.0.1:{port}: {e}"),
        }
    }
}

/// Send `bytes`, then read up to `len` bytes back with a deadline.
pub fn send_and_read(stream: &mut TcpStream, bytes: &[u8], len: usize, max_ms: u64) -> Vec<u8> {
    stream.set_read_timeout(Some(Duration::from_millis(max_ms))).expect("set_read_timeout");
    stream.write_all(bytes).expect("write");
    let mut buf = vec![0u8; len];
    let mut read = 0;
    while read < len {
        match stream.read(&mut buf[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) => panic!("read failed after {read} bytes: {e}"),
        }
    }
    buf.truncate(read);
    buf
}

/// A free TCP port, found by binding to port 0 and releasing it
/// immediately — racy in theory, fine for a test harness that only
/// runs one daemon at a time per port.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral port");
    listener.local_addr().expect("local_addr").port()
}
