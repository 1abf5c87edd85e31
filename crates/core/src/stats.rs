// SPDX-License-Identifier: MIT

//! Per-runtime atomic counters, so the control-socket handler can read
//! them without taking the registry lock. Every field is independently
//! observable.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RuntimeStats {
    pub connections_total: AtomicU64,
    pub connections_current: AtomicU64,
    pub messages_in: AtomicU64,
    pub messages_out: AtomicU64,
    pub bytes_in: AtomicU64,
    pub bytes_out: AtomicU64,
    /// Submissions dropped after a flush-and-retry still failed.
    pub submissions_dropped: AtomicU64,
    /// Accept completions rejected for exceeding max-connections.
    pub connections_rejected: AtomicU64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RuntimeStatsSnapshot {
    pub connections_total: u64,
    pub connections_current: u64,
    pub messages_in: u64,
    pub messages_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub submissions_dropped: u64,
    pub connections_rejected: u64,
}

impl RuntimeStats {
    pub fn on_connect(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_current.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_disconnect(&self) {
        self.connections_current.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn on_message_in(&self, bytes: u64) {
        self.messages_in.fetch_add(1, Ordering::Relaxed);
        self.bytes_in.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn on_message_out(&self, bytes: u64) {
        self.messages_out.fetch_add(1, Ordering::Relaxed);
        self.bytes_out.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RuntimeStatsSnapshot {
        RuntimeStatsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_current: self.connections_current.load(Ordering::Relaxed),
            messages_in: self.messages_in.load(Ordering::Relaxed),
            messages_out: self.messages_out.load(Ordering::Relaxed),
            bytes_in: self.bytes_in.load(Ordering::Relaxed),
            bytes_out: self.bytes_out.load(Ordering::Relaxed),
            submissions_dropped: self.submissions_dropped.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
