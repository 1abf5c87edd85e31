// SPDX-License-Identifier: MIT

//! The closed set of runtime kinds and lifecycle states: a tagged
//! variant rather than open-ended extensibility.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeKind {
    Server,
    Client,
    Proxy,
    Cache,
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuntimeKind::Server => "server",
            RuntimeKind::Client => "client",
            RuntimeKind::Proxy => "proxy",
            RuntimeKind::Cache => "cache",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for RuntimeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "server" => Ok(RuntimeKind::Server),
            "client" => Ok(RuntimeKind::Client),
            "proxy" => Ok(RuntimeKind::Proxy),
            "cache" => Ok(RuntimeKind::Cache),
            other => Err(format!("unknown runtime kind: {other}")),
        }
    }
}

/// Lifecycle state: created -> running -> stopped, or failed on setup
/// error. Only `remove` destroys a runtime outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Created,
    Running,
    Stopped,
    Failed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Created => "created",
            LifecycleState::Running => "running",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// What happens to a runtime's children when its owner stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildPolicy {
    /// Children are stopped but their persisted configs are kept.
    Stop,
    /// Children are stopped and their persisted configs are deleted.
    Remove,
}

impl Default for ChildPolicy {
    fn default() -> Self {
        ChildPolicy::Stop
    }
}

#[cfg(test)]
#[path = "kind_tests.rs"]
mod tests;
