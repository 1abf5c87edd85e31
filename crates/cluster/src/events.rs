// SPDX-License-Identifier: MIT

//! Events the publisher delivers to subscribing runtime scripts (spec
//! §4.7: `on_cluster_join`, and implied `on_cluster_leave`/group-change
//! callbacks — the extension-VM surface lives in `sk-runtimes`; this
//! crate only computes which events fired).

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterEvent {
    DaemonJoin { daemon: String },
    DaemonLeave { daemon: String },
    GroupChange { group: String, count: usize },
}
