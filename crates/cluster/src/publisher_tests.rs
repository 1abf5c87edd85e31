// SPDX-License-Identifier: MIT

use super::*;
use crate::snapshot::RuntimeSnapshot;

fn runtimes() -> Vec<RuntimeSnapshot> {
    vec![RuntimeSnapshot {
        name: "s1".to_string(),
        kind: "server".to_string(),
        group: Some("web".to_string()),
        port: 19000,
        state: "running".to_string(),
        connections: 1,
    }]
}

#[test]
fn claim_refuses_a_fresh_duplicate_name() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut first = ClusterPublisher::claim("d1".into(), "host".into(), dir.path().into(), 1000).expect("claim");
    first.tick(1000, runtimes()).expect("tick");

    let err = ClusterPublisher::claim("d1".into(), "host2".into(), dir.path().into(), 1005);
    assert!(matches!(err, Err(ClusterError::NameClaimed(_))));
}

#[test]
fn claim_allows_a_stale_duplicate_name() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut first = ClusterPublisher::claim("d1".into(), "host".into(), dir.path().into(), 1000).expect("claim");
    first.tick(1000, runtimes()).expect("tick");

    // 20s later the old snapshot is stale; a second daemon may reclaim the name.
    ClusterPublisher::claim("d1".into(), "host2".into(), dir.path().into(), 1020).expect("reclaim");
}

#[test]
fn two_daemons_see_each_other_join() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut a = ClusterPublisher::claim("a".into(), "host-a".into(), dir.path().into(), 1000).expect("claim a");
    let mut b = ClusterPublisher::claim("b".into(), "host-b".into(), dir.path().into(), 1000).expect("claim b");

    let events_a = a.tick(1000, runtimes()).expect("tick a");
    assert!(events_a.is_empty(), "b hasn't published yet");

    let events_b = b.tick(1000, runtimes()).expect("tick b");
    assert!(events_b.contains(&ClusterEvent::DaemonJoin { daemon: "a".into() }));

    let events_a2 = a.tick(1001, runtimes()).expect("tick a again");
    assert!(events_a2.contains(&ClusterEvent::DaemonJoin { daemon: "b".into() }));
}

#[test]
fn a_peer_going_stale_fires_leave() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut a = ClusterPublisher::claim("a".into(), "host-a".into(), dir.path().into(), 1000).expect("claim a");
    let mut b = ClusterPublisher::claim("b".into(), "host-b".into(), dir.path().into(), 1000).expect("claim b");
    b.tick(1000, runtimes()).expect("tick b");
    let joined = a.tick(1000, runtimes()).expect("tick a");
    assert!(joined.contains(&ClusterEvent::DaemonJoin { daemon: "b".into() }));

    // b never ticks again; 11s later its snapshot is stale.
    let left = a.tick(1011, runtimes()).expect("tick a later");
    assert!(left.contains(&ClusterEvent::DaemonLeave { daemon: "b".into() }));
}

#[test]
fn group_change_fires_when_peer_count_shifts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut a = ClusterPublisher::claim("a".into(), "host-a".into(), dir.path().into(), 1000).expect("claim a");
    let mut b = ClusterPublisher::claim("b".into(), "host-b".into(), dir.path().into(), 1000).expect("claim b");

    b.tick(1000, runtimes()).expect("tick b");
    let events = a.tick(1000, runtimes()).expect("tick a");
    assert!(events.iter().any(|e| matches!(e, ClusterEvent::GroupChange { group, count } if group == "web" && *count == 2)));
}
