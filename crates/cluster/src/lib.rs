// SPDX-License-Identifier: MIT

//! sk-cluster: the file-watching publisher/consumer that fans a
//! daemon's runtime snapshot out to a shared directory and diffs
//! sibling daemons' snapshots into join/leave/group-change events.
//! Cluster membership here is entirely a property of who has written
//! a fresh snapshot file — there is no gossip protocol, no RPC, no
//! cross-daemon connection of any kind.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod error;
mod events;
mod publisher;
mod snapshot;

pub use error::{ClusterError, Result};
pub use events::ClusterEvent;
pub use publisher::ClusterPublisher;
pub use snapshot::{DaemonSnapshot, RuntimeSnapshot};
