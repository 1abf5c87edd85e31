// SPDX-License-Identifier: MIT

//! Shapes returned by read-only control-socket commands (`ls`, `ps`,
//! `show`, `stats`).

use serde::{Deserialize, Serialize};
use sk_core::{ChildPolicy, LifecycleState, RuntimeId, RuntimeKind, RuntimeStatsSnapshot};

/// One row of `ls`/`ps`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeSummary {
    pub id: RuntimeId,
    pub name: String,
    pub kind: RuntimeKind,
    pub state: LifecycleState,
    pub port: u16,
    pub group: Option<String>,
    pub connections: u64,
}

/// Full detail for `show <name>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeDetail {
    pub id: RuntimeId,
    pub name: String,
    pub kind: RuntimeKind,
    pub state: LifecycleState,
    pub port: u16,
    pub udp: bool,
    pub tls: bool,
    pub script_path: Option<String>,
    pub owner: Option<String>,
    pub child_policy: ChildPolicy,
    pub group: Option<String>,
    pub created_at_epoch_ms: u64,
    pub started_at_epoch_ms: Option<u64>,
    pub stats: RuntimeStatsSnapshot,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
