//! Server runtime end-to-end behavior.

use crate::prelude::*;

#[test]
fn echo_scenario_broadcasts_inbound_bytes_back_to_the_sender() {
    let h = Harness::new();
    let port = free_port();

    h.cli().args(["create", "server", "s1", "-p", &port.to_string()]).passes();
    h.cli().args(["start", "s1"]).passes();

    let mut stream = connect_with_retry(port, SPEC_WAIT_MAX_MS);
    let echoed = send_and_read(&mut stream, b"hello\n", 6, SPEC_WAIT_MAX_MS);
    assert_eq!(echoed, b"hello\n");
}

#[test]
fn ls_reports_a_created_but_unstarted_runtime_as_created() {
    let h = Harness::new();
    h.cli().args(["create", "server", "s2", "-p", &free_port().to_string()]).passes();
    h.cli().args(["ls"]).passes().stdout_has("s2").stdout_has("created");
}

#[test]
fn ls_reports_a_started_runtime_as_running() {
    let h = Harness::new();
    let port = free_port();
    h.cli().args(["create", "server", "s3", "-p", &port.to_string()]).passes();
    h.cli().args(["start", "s3"]).passes();
    h.cli().args(["ls"]).passes().stdout_has("s3").stdout_has("running");
}

#[test]
fn ps_omits_runtimes_that_were_never_started() {
    let h = Harness::new();
    h.cli().args(["create", "server", "s4", "-p", &free_port().to_string()]).passes();
    let body = h.cli().args(["ps"]).passes().stdout();
    assert!(!body.contains("s4"), "ps should only list running runtimes, got: {body:?}");
}

#[test]
fn stop_closes_the_listening_port() {
    let h = Harness::new();
    let port = free_port();
    h.cli().args(["create", "server", "s5", "-p", &port.to_string()]).passes();
    h.cli().args(["start", "s5"]).passes();
    connect_with_retry(port, SPEC_WAIT_MAX_MS);

    h.cli().args(["stop", "s5"]).passes();

    let closed = wait_for(SPEC_WAIT_MAX_MS, || std::net::TcpStream::connect(("127.0.0.1", port)).is_err());
    assert!(closed, "port {port} should stop accepting connections once s5 is stopped");
}

#[test]
fn two_connections_to_the_same_echo_server_stay_independent() {
    let h = Harness::new();
    let port = free_port();
    h.cli().args(["create", "server", "s6", "-p", &port.to_string()]).passes();
    h.cli().args(["start", "s6"]).passes();

    let mut a = connect_with_retry(port, SPEC_WAIT_MAX_MS);
    let mut b = connect_with_retry(port, SPEC_WAIT_MAX_MS);
    let reply_a = send_and_read(&mut a, b"from-a\n", 7, SPEC_WAIT_MAX_MS);
    let reply_b = send_and_read(&mut b, b"from-b\n", 7, SPEC_WAIT_MAX_MS);
    assert_eq!(reply_a, b"from-a\n");
    assert_eq!(reply_b, b"from-b\n");
}
