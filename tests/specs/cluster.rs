//! Cluster join behavior. Driven directly against
//! `sk_cluster::ClusterPublisher` rather than the `socketley` binary:
//! the wire protocol has no introspection command (`cluster-dir`
//! always answers with an error — see
//! `sk-daemon::listener::commands::handle`), so "seeing a peer" is
//! only observable at this layer. Every other file in this suite
//! drives the CLI.

use sk_cluster::{ClusterPublisher, RuntimeSnapshot};

fn runtime(name: &str, group: Option<&str>) -> RuntimeSnapshot {
    RuntimeSnapshot {
        name: name.to_string(),
        kind: "server".to_string(),
        group: group.map(str::to_string),
        port: 9000,
        state: "running".to_string(),
        connections: 0,
    }
}

#[test]
fn two_daemons_in_the_same_directory_see_each_other_exactly_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut a = ClusterPublisher::claim("daemon-a".into(), "host-a".into(), dir.path().into(), 1_000).expect("claim a");
    let mut b = ClusterPublisher::claim("daemon-b".into(), "host-b".into(), dir.path().into(), 1_000).expect("claim b");

    let events_a1 = a.tick(1_000, vec![runtime("s1", None)]).expect("a tick 1");
    assert!(events_a1.is_empty(), "a hasn't seen b publish yet, no join should fire");

    let events_b1 = b.tick(1_000, vec![runtime("s2", None)]).expect("b tick 1");
    assert_eq!(events_b1, vec![sk_cluster::ClusterEvent::DaemonJoin { daemon: "daemon-a".into() }]);

    let events_a2 = a.tick(1_001, vec![runtime("s1", None)]).expect("a tick 2");
    assert_eq!(events_a2, vec![sk_cluster::ClusterEvent::DaemonJoin { daemon: "daemon-b".into() }]);

    // A third tick from each sees no new joins — the callback fires
    // exactly once per peer, not once per tick.
    let events_a3 = a.tick(1_002, vec![runtime("s1", None)]).expect("a tick 3");
    let events_b2 = b.tick(1_002, vec![runtime("s2", None)]).expect("b tick 2");
    assert!(events_a3.is_empty());
    assert!(events_b2.is_empty());
}

#[test]
fn a_peer_going_stale_fires_a_leave_event() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut a = ClusterPublisher::claim("daemon-a".into(), "host-a".into(), dir.path().into(), 0).expect("claim a");
    let mut b = ClusterPublisher::claim("daemon-b".into(), "host-b".into(), dir.path().into(), 0).expect("claim b");

    b.tick(0, vec![]).expect("b tick");
    let joined = a.tick(0, vec![]).expect("a tick sees b");
    assert_eq!(joined, vec![sk_cluster::ClusterEvent::DaemonJoin { daemon: "daemon-b".into() }]);

    // b never ticks again; once its heartbeat is older than the 10s
    // freshness window, a's next tick should report it gone.
    let left = a.tick(20, vec![]).expect("a tick after b goes stale");
    assert_eq!(left, vec![sk_cluster::ClusterEvent::DaemonLeave { daemon: "daemon-b".into() }]);
}

#[test]
fn claiming_an_already_fresh_daemon_name_is_refused() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut a = ClusterPublisher::claim("daemon-a".into(), "host-a".into(), dir.path().into(), 0).expect("first claim");
    a.tick(0, vec![]).expect("tick to publish the snapshot");

    let second = ClusterPublisher::claim("daemon-a".into(), "host-a".into(), dir.path().into(), 1);
    assert!(second.is_err(), "a fresh heartbeat under the same name should be refused");
}

#[test]
fn group_counts_sum_across_fresh_peers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut a = ClusterPublisher::claim("daemon-a".into(), "host-a".into(), dir.path().into(), 0).expect("claim a");
    let mut b = ClusterPublisher::claim("daemon-b".into(), "host-b".into(), dir.path().into(), 0).expect("claim b");

    b.tick(0, vec![runtime("s2", Some("web"))]).expect("b tick");
    let events = a.tick(0, vec![runtime("s1", Some("web"))]).expect("a tick");

    assert!(events.contains(&sk_cluster::ClusterEvent::GroupChange { group: "web".into(), count: 2 }));
}
