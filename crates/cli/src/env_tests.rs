use super::*;
use serial_test::serial;

#[test]
#[serial]
fn state_dir_honors_explicit_override() {
    std::env::set_var("SOCKETLEY_STATE_DIR", "/tmp/sk-cli-test-state");
    assert_eq!(state_dir(), PathBuf::from("/tmp/sk-cli-test-state"));
    std::env::remove_var("SOCKETLEY_STATE_DIR");
}

#[test]
#[serial]
fn socket_path_honors_explicit_override() {
    std::env::set_var("SOCKETLEY_SOCKET_PATH", "/tmp/sk-cli-test.sock");
    assert_eq!(socket_path(), PathBuf::from("/tmp/sk-cli-test.sock"));
    std::env::remove_var("SOCKETLEY_SOCKET_PATH");
}

#[test]
#[serial]
fn ipc_timeout_defaults_to_five_seconds() {
    std::env::remove_var("SOCKETLEY_IPC_TIMEOUT_MS");
    assert_eq!(ipc_timeout(), Duration::from_secs(5));
}
