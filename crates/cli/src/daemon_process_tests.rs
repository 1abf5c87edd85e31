use super::*;
use serial_test::serial;

#[test]
#[serial]
fn read_daemon_pid_parses_the_lock_file_contents() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("SOCKETLEY_STATE_DIR", dir.path());
    std::fs::write(dir.path().join("daemon.pid"), "4242").unwrap();
    assert_eq!(read_daemon_pid(), Some(4242));
    std::env::remove_var("SOCKETLEY_STATE_DIR");
}

#[test]
#[serial]
fn read_daemon_pid_is_none_when_file_missing() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("SOCKETLEY_STATE_DIR", dir.path());
    assert_eq!(read_daemon_pid(), None);
    std::env::remove_var("SOCKETLEY_STATE_DIR");
}

#[test]
#[serial]
fn read_daemon_pid_is_none_on_garbage_contents() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("SOCKETLEY_STATE_DIR", dir.path());
    std::fs::write(dir.path().join("daemon.pid"), "not-a-pid").unwrap();
    assert_eq!(read_daemon_pid(), None);
    std::env::remove_var("SOCKETLEY_STATE_DIR");
}

#[test]
#[serial]
fn signal_daemon_fails_gracefully_with_no_pid_recorded() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("SOCKETLEY_STATE_DIR", dir.path());
    assert!(!signal_daemon(libc::SIGTERM));
    std::env::remove_var("SOCKETLEY_STATE_DIR");
}
