// SPDX-License-Identifier: MIT

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn state_dir_honors_explicit_override() {
    std::env::set_var("SOCKETLEY_STATE_DIR", "/tmp/sk-test-state");
    assert_eq!(state_dir(), PathBuf::from("/tmp/sk-test-state"));
    std::env::remove_var("SOCKETLEY_STATE_DIR");
}

#[test]
#[serial]
fn socket_path_honors_explicit_override() {
    std::env::set_var("SOCKETLEY_SOCKET_PATH", "/tmp/sk-test.sock");
    assert_eq!(socket_path(), PathBuf::from("/tmp/sk-test.sock"));
    std::env::remove_var("SOCKETLEY_SOCKET_PATH");
}

#[test]
#[serial]
fn tcp_port_absent_by_default() {
    std::env::remove_var("SOCKETLEY_TCP_PORT");
    assert_eq!(tcp_port(), None);
}

#[test]
#[serial]
fn auth_token_rejects_empty_value() {
    std::env::set_var("SOCKETLEY_AUTH_TOKEN", "");
    assert_eq!(auth_token(), None);
    std::env::remove_var("SOCKETLEY_AUTH_TOKEN");
}

#[test]
#[serial]
fn ipc_timeout_defaults_to_five_seconds() {
    std::env::remove_var("SOCKETLEY_IPC_TIMEOUT_MS");
    assert_eq!(ipc_timeout(), Duration::from_secs(5));
}
