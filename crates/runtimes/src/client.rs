// SPDX-License-Identifier: MIT

//! The client runtime: non-blocking connect with an exponential-backoff
//! reconnect policy, then a raw read loop that
//! delivers bytes to the extension VM the same way a server
//! connection's raw-bytes mode does. `send()` queues writes for the
//! reactor to flush via writev once the underlying fd is writable.

use std::time::Duration;

use sk_core::{RuntimeStats, RuntimeStatsSnapshot};

use crate::base::WriteQueue;
use crate::extension::{ConnCtx, ExtensionVm, NullVm};

const BASE_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// `-1` disabled, `0` infinite, `n>0` capped at `n` attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy(pub i64);

impl ReconnectPolicy {
    pub fn disabled() -> Self {
        Self(-1)
    }

    pub fn infinite() -> Self {
        Self(0)
    }

    pub fn max_attempts(n: u32) -> Self {
        Self(i64::from(n))
    }

    fn allows(self, attempts_so_far: u32) -> bool {
        match self.0 {
            n if n < 0 => false,
            0 => true,
            n => i64::from(attempts_so_far) < n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Connecting,
    Connected,
}

pub struct ClientConfig {
    pub reconnect: ReconnectPolicy,
    pub write_high_water_mark: usize,
}

pub struct ClientRuntime<V: ExtensionVm = NullVm> {
    config: ClientConfig,
    vm: V,
    state: ClientState,
    attempts: u32,
    write_queue: WriteQueue,
    stats: RuntimeStats,
}

impl<V: ExtensionVm> ClientRuntime<V> {
    pub fn new(config: ClientConfig, vm: V) -> Self {
        let write_queue = WriteQueue::new(config.write_high_water_mark);
        Self { config, vm, state: ClientState::Disconnected, attempts: 0, write_queue, stats: RuntimeStats::default() }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn begin_connect(&mut self) {
        self.state = ClientState::Connecting;
    }

    pub fn on_connected(&mut self) {
        self.state = ClientState::Connected;
        self.attempts = 0;
        self.stats.on_connect();
        let empty = std::collections::HashMap::new();
        self.vm.on_connect(&ConnCtx { connection_id: 0, metadata: &empty });
    }

    /// Called on a failed connect attempt, or on the drop of an
    /// established connection. Returns the backoff delay before the
    /// next attempt, or `None` if the reconnect policy has given up.
    pub fn on_disconnected(&mut self) -> Option<Duration> {
        let was_connected = self.state == ClientState::Connected;
        self.state = ClientState::Disconnected;
        if was_connected {
            self.stats.on_disconnect();
            let empty = std::collections::HashMap::new();
            self.vm.on_disconnect(&ConnCtx { connection_id: 0, metadata: &empty });
        }
        if !self.config.reconnect.allows(self.attempts) {
            return None;
        }
        let delay = backoff_for(self.attempts);
        self.attempts += 1;
        Some(delay)
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.stats.on_message_in(bytes.len() as u64);
        let empty = std::collections::HashMap::new();
        self.vm.on_message(&ConnCtx { connection_id: 0, metadata: &empty }, bytes);
    }

    /// Queue a payload for the caller to flush via writev once the fd
    /// is writable. May be called from the extension VM.
    pub fn send(&mut self, payload: Vec<u8>) {
        self.write_queue.push(payload);
    }

    pub fn drain_writes(&mut self) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(frame) = self.write_queue.pop() {
            out.push(frame);
        }
        out
    }

    pub fn dropped_writes(&self) -> u64 {
        self.write_queue.dropped
    }

    pub fn stats_snapshot(&self) -> RuntimeStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn connection_count(&self) -> usize {
        usize::from(self.state == ClientState::Connected)
    }

    pub fn deliver_pubsub(&mut self, channel: &str, message: &[u8]) -> bool {
        if self.vm.subscriptions().iter().any(|c| c == channel) {
            self.vm.on_publish(channel, message);
            true
        } else {
            false
        }
    }
}

impl<V: ExtensionVm> sk_registry::RuntimeHandle for ClientRuntime<V> {
    fn teardown(&mut self) {
        self.state = ClientState::Disconnected;
        self.write_queue = WriteQueue::new(self.config.write_high_water_mark);
    }

    fn stats(&self) -> RuntimeStatsSnapshot {
        self.stats_snapshot()
    }

    fn connection_count(&self) -> usize {
        ClientRuntime::connection_count(self)
    }

    fn deliver_pubsub(&mut self, channel: &str, message: &[u8]) -> bool {
        ClientRuntime::deliver_pubsub(self, channel, message)
    }
}

fn backoff_for(attempts: u32) -> Duration {
    let capped = attempts.min(5); // 1s * 2^5 = 32s already exceeds the 30s cap
    let multiplier = 1u32 << capped;
    BASE_BACKOFF.saturating_mul(multiplier).min(MAX_BACKOFF)
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
