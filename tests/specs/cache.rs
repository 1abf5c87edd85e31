//! Cache runtime end-to-end behavior, including the inline round-trip
//! laws. RESP2 and snapshot-format coverage lives
//! in `sk-runtimes`'s own unit tests — this file only exercises what
//! needs a real accepted connection on a real daemon.

use crate::prelude::*;

#[test]
fn ttl_scenario_expires_a_key_after_its_deadline() {
    let h = Harness::new();
    let port = free_port();
    h.cli().args(["create", "cache", "c1", "-p", &port.to_string()]).passes();
    h.cli().args(["start", "c1"]).passes();

    let mut stream = connect_with_retry(port, SPEC_WAIT_MAX_MS);
    assert_eq!(send_and_read(&mut stream, b"SET foo bar\n", 5, SPEC_WAIT_MAX_MS), b"+OK\r\n");
    assert_eq!(send_and_read(&mut stream, b"EXPIRE foo 1\n", 4, SPEC_WAIT_MAX_MS), b":1\r\n");

    std::thread::sleep(std::time::Duration::from_millis(1500));

    let reply = send_and_read(&mut stream, b"GET foo\n", 64, 2_000);
    assert_eq!(reply, b"$-1\r\n", "GET after TTL expiry should report a miss");
}

#[test]
fn set_then_get_round_trips_the_value() {
    let h = Harness::new();
    let port = free_port();
    h.cli().args(["create", "cache", "c2", "-p", &port.to_string()]).passes();
    h.cli().args(["start", "c2"]).passes();

    let mut stream = connect_with_retry(port, SPEC_WAIT_MAX_MS);
    send_and_read(&mut stream, b"SET k v\n", 5, SPEC_WAIT_MAX_MS);
    let reply = send_and_read(&mut stream, b"GET k\n", 64, SPEC_WAIT_MAX_MS);
    assert_eq!(reply, b"$1\r\nv\r\n", "GET should return the value just SET");
}

#[test]
fn del_then_get_reports_a_miss() {
    let h = Harness::new();
    let port = free_port();
    h.cli().args(["create", "cache", "c3", "-p", &port.to_string()]).passes();
    h.cli().args(["start", "c3"]).passes();

    let mut stream = connect_with_retry(port, SPEC_WAIT_MAX_MS);
    send_and_read(&mut stream, b"SET k v\n", 5, SPEC_WAIT_MAX_MS);
    send_and_read(&mut stream, b"DEL k\n", 4, SPEC_WAIT_MAX_MS);
    let reply = send_and_read(&mut stream, b"GET k\n", 64, 2_000);
    assert_eq!(reply, b"$-1\r\n", "GET after DEL should report a miss");
}
