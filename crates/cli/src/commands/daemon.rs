// SPDX-License-Identifier: MIT

//! `socketley daemon ...` — local process management: start/stop/
//! restart the `socketleyd` process, report whether it's running, and
//! tail its log file. Status is read from the lock-file pid rather
//! than a control-socket RPC, since the wire protocol has no
//! process-introspection command, only per-runtime ones.

use std::io::{BufRead, BufReader};
use std::time::{Duration, Instant};

use clap::Subcommand;

use crate::client::DaemonClient;
use crate::daemon_process;

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon if it isn't already running
    Start,
    /// Stop the running daemon
    Stop,
    /// Check whether the daemon is running
    Status,
    /// Stop then start the daemon
    Restart,
    /// Show the daemon's log file
    Logs {
        #[arg(short = 'n', long, default_value = "200")]
        lines: usize,
    },
}

pub fn dispatch(cmd: DaemonCommand) -> i32 {
    match cmd {
        DaemonCommand::Start => start(),
        DaemonCommand::Stop => stop(),
        DaemonCommand::Status => status(),
        DaemonCommand::Restart => restart(),
        DaemonCommand::Logs { lines } => logs(lines),
    }
}

fn start() -> i32 {
    if DaemonClient::connect().is_ok() {
        println!("daemon already running");
        return 0;
    }
    match DaemonClient::connect_or_start() {
        Ok(_) => {
            println!("daemon started");
            0
        }
        Err(e) => {
            eprintln!("{e}");
            e.code
        }
    }
}

fn stop() -> i32 {
    if DaemonClient::connect().is_err() {
        println!("daemon not running");
        return 0;
    }
    if !daemon_process::signal_daemon(libc::SIGTERM) {
        eprintln!("could not signal daemon (no recorded pid, or it exited already)");
        return 2;
    }
    let deadline = Instant::now() + Duration::from_secs(5);
    while DaemonClient::connect().is_ok() {
        if Instant::now() >= deadline {
            eprintln!("daemon did not stop within 5s");
            return 2;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    println!("daemon stopped");
    0
}

fn restart() -> i32 {
    let code = stop();
    if code != 0 {
        return code;
    }
    start()
}

fn status() -> i32 {
    match DaemonClient::connect() {
        Ok(mut client) => match client.send_line("ls") {
            Ok((_, body)) => {
                let count = if body.is_empty() { 0 } else { body.lines().count() };
                println!("status: running");
                println!("runtimes: {count}");
                0
            }
            Err(e) => {
                eprintln!("{e}");
                e.code
            }
        },
        Err(_) => {
            println!("status: not running");
            0
        }
    }
}

fn logs(limit: usize) -> i32 {
    let log_dir = crate::env::state_dir().join("logs");
    let Some(path) = latest_log(&log_dir) else {
        println!("no log file found under {}", log_dir.display());
        return 0;
    };
    let file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("failed to open {}: {e}", path.display());
            return 2;
        }
    };
    let all_lines: Vec<String> = match BufReader::new(file).lines().collect() {
        Ok(l) => l,
        Err(e) => {
            eprintln!("failed to read {}: {e}", path.display());
            return 2;
        }
    };
    let start = all_lines.len().saturating_sub(limit);
    for line in &all_lines[start..] {
        println!("{line}");
    }
    0
}

/// `tracing_appender::rolling::daily` names files `socketleyd.log.<date>`;
/// pick the lexicographically last, which is also the most recent.
fn latest_log(dir: &std::path::Path) -> Option<std::path::PathBuf> {
    let mut entries: Vec<_> = std::fs::read_dir(dir).ok()?.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    entries.sort();
    entries.pop()
}
