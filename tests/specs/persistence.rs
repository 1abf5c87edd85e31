//! Persistence replay: a running runtime survives an unannounced
//! daemon death and comes back running, bound to the same port, on
//! the next command that touches the daemon (which auto-restarts it).

use crate::prelude::*;

fn daemon_pid(h: &Harness) -> u32 {
    let raw = std::fs::read_to_string(h.state_dir().join("daemon.pid")).expect("daemon.pid should exist once the daemon has started");
    raw.trim().parse().expect("daemon.pid should hold a plain integer")
}

#[test]
fn a_running_server_survives_sigterm_and_rebinds_on_restart() {
    let h = Harness::new();
    let port = free_port();
    h.cli().args(["create", "server", "persist1", "-p", &port.to_string()]).passes();
    h.cli().args(["start", "persist1"]).passes();

    let pid = daemon_pid(&h);
    let killed = std::process::Command::new("kill").args(["-TERM", &pid.to_string()]).status().expect("kill should run").success();
    assert!(killed, "should be able to SIGTERM the daemon");

    let dead = wait_for(SPEC_WAIT_MAX_MS, || !h.socket_path().exists());
    assert!(dead, "control socket should disappear once the daemon exits");

    let body = h.cli().args(["ls"]).passes().stdout();
    assert!(body.contains("persist1"), "ls after restart should still list persist1, got: {body:?}");
    assert!(body.contains("running"), "persist1 was running at SIGTERM time so replay should restart it, got: {body:?}");

    let mut stream = connect_with_retry(port, SPEC_WAIT_MAX_MS);
    assert_eq!(send_and_read(&mut stream, b"still-here\n", 11, SPEC_WAIT_MAX_MS), b"still-here\n");
}

#[test]
fn config_attributes_round_trip_through_dump() {
    let h = Harness::new();
    let port = free_port();
    h.cli()
        .args(["create", "proxy", "persist2", "-p", &port.to_string(), "--backend", "127.0.0.1:1,127.0.0.1:2", "--group", "g1", "--owner", "alice"])
        .passes();

    let before = h.cli().args(["dump", "persist2"]).passes().stdout();

    let pid = daemon_pid(&h);
    std::process::Command::new("kill").args(["-TERM", &pid.to_string()]).status().expect("kill should run");
    wait_for(SPEC_WAIT_MAX_MS, || !h.socket_path().exists());

    let after = h.cli().args(["dump", "persist2"]).passes().stdout();
    assert_eq!(before, after, "save/load should round-trip every configurable attribute unchanged");
}
