// SPDX-License-Identifier: MIT

//! The cluster publisher: owned by the registry, ticked every 2s.
//! Writes this daemon's snapshot, scans sibling snapshots,
//! and diffs the peer set and per-group counts against the previous
//! tick to compute join/leave/group-change events.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use crate::error::{ClusterError, Result};
use crate::events::ClusterEvent;
use crate::snapshot::{self, DaemonSnapshot, RuntimeSnapshot};

pub struct ClusterPublisher {
    daemon: String,
    host: String,
    cluster_dir: PathBuf,
    known_peers: HashSet<String>,
    group_counts: BTreeMap<String, usize>,
}

impl ClusterPublisher {
    /// Refuses to start if another daemon already publishes `daemon`
    /// with a fresh heartbeat.
    pub fn claim(daemon: String, host: String, cluster_dir: PathBuf, now_unix_secs: u64) -> Result<Self> {
        for peer in snapshot::scan_peers(&cluster_dir, "")? {
            if peer.daemon == daemon && peer.is_fresh(now_unix_secs) {
                return Err(ClusterError::NameClaimed(daemon));
            }
        }
        Ok(Self { daemon, host, cluster_dir, known_peers: HashSet::new(), group_counts: BTreeMap::new() })
    }

    pub fn daemon_name(&self) -> &str {
        &self.daemon
    }

    /// Publish this tick's snapshot, scan peers, and return the events
    /// that fired.
    pub fn tick(&mut self, now_unix_secs: u64, runtimes: Vec<RuntimeSnapshot>) -> Result<Vec<ClusterEvent>> {
        let mine = DaemonSnapshot { daemon: self.daemon.clone(), host: self.host.clone(), heartbeat: now_unix_secs, runtimes };
        snapshot::write(&self.cluster_dir, &mine)?;

        let peers = snapshot::scan_peers(&self.cluster_dir, &self.daemon)?;
        let fresh_peers: HashSet<String> =
            peers.iter().filter(|p| p.is_fresh(now_unix_secs)).map(|p| p.daemon.clone()).collect();

        let mut events = Vec::new();
        for joined in fresh_peers.difference(&self.known_peers) {
            events.push(ClusterEvent::DaemonJoin { daemon: joined.clone() });
        }
        for left in self.known_peers.difference(&fresh_peers) {
            events.push(ClusterEvent::DaemonLeave { daemon: left.clone() });
        }
        self.known_peers = fresh_peers;

        let mut counts = mine.group_counts();
        for peer in peers.iter().filter(|p| p.is_fresh(now_unix_secs)) {
            for (group, count) in peer.group_counts() {
                *counts.entry(group).or_insert(0) += count;
            }
        }
        for (group, count) in &counts {
            if self.group_counts.get(group) != Some(count) {
                events.push(ClusterEvent::GroupChange { group: group.clone(), count: *count });
            }
        }
        for group in self.group_counts.keys() {
            if !counts.contains_key(group) {
                events.push(ClusterEvent::GroupChange { group: group.clone(), count: 0 });
            }
        }
        self.group_counts = counts;

        Ok(events)
    }
}

#[cfg(test)]
#[path = "publisher_tests.rs"]
mod tests;
