// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn detects_http_from_a_get_line() {
    assert_eq!(detect_protocol(b"GET / HTTP/1.1\r\n"), Protocol::Http);
}

#[test]
fn detects_raw_bytes_for_non_http_input() {
    assert_eq!(detect_protocol(b"\x01\x02hello"), Protocol::RawBytes);
}

#[test]
fn new_connection_starts_undetermined_with_an_empty_inbox() {
    let state = ConnectionState::new(4096);
    assert_eq!(state.protocol, Protocol::Undetermined);
    assert!(state.inbox.is_empty());
}
