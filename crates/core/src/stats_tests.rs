// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn connect_disconnect_track_current_and_total() {
    let stats = RuntimeStats::default();
    stats.on_connect();
    stats.on_connect();
    stats.on_disconnect();
    let snap = stats.snapshot();
    assert_eq!(snap.connections_total, 2);
    assert_eq!(snap.connections_current, 1);
}

#[test]
fn message_counters_accumulate_bytes() {
    let stats = RuntimeStats::default();
    stats.on_message_in(10);
    stats.on_message_in(5);
    stats.on_message_out(3);
    let snap = stats.snapshot();
    assert_eq!(snap.messages_in, 2);
    assert_eq!(snap.bytes_in, 15);
    assert_eq!(snap.messages_out, 1);
    assert_eq!(snap.bytes_out, 3);
}

#[test]
fn snapshot_is_independent_of_later_mutation() {
    let stats = RuntimeStats::default();
    stats.on_connect();
    let snap = stats.snapshot();
    stats.on_connect();
    assert_eq!(snap.connections_total, 1);
}
