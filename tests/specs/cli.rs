//! CLI plumbing: the control subcommands and the `daemon` management
//! subcommands. Each exercises the real `socketley` binary
//! against an isolated daemon.

use crate::prelude::*;

#[test]
fn owner_query_before_any_set_reports_a_placeholder() {
    let h = Harness::new();
    h.cli().args(["create", "server", "o1", "-p", &free_port().to_string()]).passes();
    h.cli().args(["owner", "o1"]).passes().stdout_has("-");
}

#[test]
fn owner_set_then_query_round_trips() {
    let h = Harness::new();
    h.cli().args(["create", "server", "o2", "-p", &free_port().to_string()]).passes();
    h.cli().args(["owner", "o2", "alice"]).passes();
    h.cli().args(["owner", "o2"]).passes().stdout_has("alice");
}

#[test]
fn owner_query_does_not_clear_a_previously_set_owner() {
    let h = Harness::new();
    h.cli().args(["create", "server", "o3", "-p", &free_port().to_string()]).passes();
    h.cli().args(["owner", "o3", "bob"]).passes();

    // Querying twice in a row must be side-effect free.
    h.cli().args(["owner", "o3"]).passes().stdout_has("bob");
    h.cli().args(["owner", "o3"]).passes().stdout_has("bob");
}

#[test]
fn remove_deletes_a_runtimes_persisted_config() {
    let h = Harness::new();
    h.cli().args(["create", "server", "r1", "-p", &free_port().to_string()]).passes();
    h.cli().args(["remove", "r1"]).passes();
    let body = h.cli().args(["ls"]).passes().stdout();
    assert!(!body.contains("r1"), "removed runtime should no longer be listed, got: {body:?}");
}

#[test]
fn edit_group_field_updates_the_persisted_config() {
    let h = Harness::new();
    h.cli().args(["create", "server", "e1", "-p", &free_port().to_string()]).passes();
    h.cli().args(["edit", "e1", "group", "frontends"]).passes();
    h.cli().args(["dump", "e1"]).passes().stdout_has("frontends");
}

#[test]
fn edit_with_an_unknown_field_fails() {
    let h = Harness::new();
    h.cli().args(["create", "server", "e2", "-p", &free_port().to_string()]).passes();
    h.cli().args(["edit", "e2", "not-a-real-field", "x"]).fails();
}

#[test]
fn create_requires_a_backend_for_a_proxy() {
    let h = Harness::new();
    h.cli().args(["create", "proxy", "badproxy", "-p", &free_port().to_string()]).fails();
}

#[test]
fn stop_on_an_unknown_runtime_fails() {
    let h = Harness::new();
    h.cli().args(["stop", "does-not-exist"]).fails();
}

#[test]
fn daemon_status_reports_not_running_before_anything_starts() {
    let h = Harness::new();
    h.cli().args(["daemon", "status"]).passes().stdout_has("not running");
}

#[test]
fn daemon_start_then_status_reports_running() {
    let h = Harness::new();
    h.cli().args(["daemon", "start"]).passes();
    h.cli().args(["daemon", "status"]).passes().stdout_has("running");
}

#[test]
fn daemon_stop_then_status_reports_not_running() {
    let h = Harness::new();
    h.cli().args(["daemon", "start"]).passes();
    h.cli().args(["daemon", "stop"]).passes();

    let stopped = wait_for(SPEC_WAIT_MAX_MS, || !h.socket_path().exists());
    assert!(stopped, "control socket should be gone once the daemon stops");
    h.cli().args(["daemon", "status"]).passes().stdout_has("not running");
}

#[test]
fn daemon_logs_reports_something_once_the_daemon_has_run() {
    let h = Harness::new();
    h.cli().args(["daemon", "start"]).passes();
    wait_for(SPEC_WAIT_MAX_MS, || h.state_dir().join("logs").exists());
    h.cli().args(["daemon", "logs"]).passes().stdout_has("socketleyd starting");
}
