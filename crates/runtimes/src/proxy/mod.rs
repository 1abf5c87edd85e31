// SPDX-License-Identifier: MIT

//! The proxy runtime: distributes connections or requests across a
//! backend set by strategy, with health checks and a
//! per-backend circuit breaker layered on top. Like every other
//! runtime kind here, this one never opens a socket itself — `select`
//! and `candidates_for_request` hand back backend *addresses* for the
//! reactor/daemon wiring layer to dial and splice.

mod backend;

use rand::Rng;

use sk_core::{RuntimeStats, RuntimeStatsSnapshot};

pub use backend::{BackendState, CircuitState};

use crate::extension::{ExtensionVm, NullVm};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyProtocol {
    Tcp,
    Http,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    RoundRobin,
    Random,
    Script,
}

pub struct ProxyConfig {
    pub protocol: ProxyProtocol,
    pub strategy: Strategy,
    /// If every backend is circuit-unavailable, try the full list once
    /// anyway rather than failing outright.
    pub retry_all: bool,
    pub health_threshold: u32,
    pub circuit_threshold: u32,
    pub circuit_timeout_ms: u64,
    /// Up to this many alternate backends per failed request; for http,
    /// only when the request method is idempotent.
    pub retry_count: u32,
    /// Longest-prefix `(path_prefix, backend_address)` overrides,
    /// checked before falling back to the strategy (http only).
    pub route_prefixes: Vec<(String, String)>,
}

pub struct ProxyRuntime<V: ExtensionVm = NullVm> {
    config: ProxyConfig,
    vm: V,
    backends: Vec<BackendState>,
    round_robin_cursor: usize,
    stats: RuntimeStats,
}

impl<V: ExtensionVm> ProxyRuntime<V> {
    pub fn new(config: ProxyConfig, vm: V, backend_addresses: Vec<String>) -> Self {
        let backends = backend_addresses.into_iter().map(BackendState::new).collect();
        Self { config, vm, backends, round_robin_cursor: 0, stats: RuntimeStats::default() }
    }

    /// Indices of backends currently available to receive traffic.
    fn available_indices(&mut self, now_ms: u64) -> Vec<usize> {
        let timeout = self.config.circuit_timeout_ms;
        (0..self.backends.len()).filter(|&i| self.backends[i].is_available(timeout, now_ms)).collect()
    }

    /// Pick one backend index per the configured strategy. Falls back
    /// to trying the full backend list once if every backend
    /// is unavailable and `retry_all` is set.
    pub fn select(&mut self, now_ms: u64) -> Option<usize> {
        let mut available = self.available_indices(now_ms);
        if available.is_empty() {
            if self.config.retry_all && !self.backends.is_empty() {
                available = (0..self.backends.len()).collect();
            } else {
                return None;
            }
        }
        match self.config.strategy {
            Strategy::RoundRobin => {
                let chosen = available[self.round_robin_cursor % available.len()];
                self.round_robin_cursor = self.round_robin_cursor.wrapping_add(1);
                Some(chosen)
            }
            Strategy::Random => {
                let idx = rand::thread_rng().gen_range(0..available.len());
                Some(available[idx])
            }
            Strategy::Script => {
                let candidates: Vec<String> = available.iter().map(|&i| self.backends[i].address.clone()).collect();
                match self.vm.select_backend(&candidates) {
                    Some(pick) if pick < available.len() => Some(available[pick]),
                    _ => {
                        let chosen = available[self.round_robin_cursor % available.len()];
                        self.round_robin_cursor = self.round_robin_cursor.wrapping_add(1);
                        Some(chosen)
                    }
                }
            }
        }
    }

    /// Longest matching path-prefix override, if any (http only).
    pub fn route_for_path(&self, path: &str) -> Option<usize> {
        let target = self
            .config
            .route_prefixes
            .iter()
            .filter(|(prefix, _)| path.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, addr)| addr.clone())?;
        self.backends.iter().position(|b| b.address == target)
    }

    /// A primary backend plus up to `retry_count` alternates for one
    /// request/connection attempt. For http, alternates are only
    /// offered when `idempotent` is true.
    pub fn candidates_for_request(&mut self, now_ms: u64, idempotent: bool) -> Vec<usize> {
        let Some(primary) = self.select(now_ms) else { return Vec::new() };
        let mut out = vec![primary];
        let offer_alternates = self.config.protocol == ProxyProtocol::Tcp || idempotent;
        if offer_alternates {
            for _ in 0..self.config.retry_count {
                match self.select(now_ms) {
                    Some(idx) if !out.contains(&idx) => out.push(idx),
                    _ => break,
                }
            }
        }
        out
    }

    pub fn record_request_result(&mut self, backend_index: usize, ok: bool, now_ms: u64) {
        if let Some(backend) = self.backends.get_mut(backend_index) {
            backend.observe_request(ok, self.config.circuit_threshold, now_ms);
        }
        if ok {
            self.stats.on_message_out(0);
        } else {
            self.stats.submissions_dropped.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    }

    pub fn observe_health_probe(&mut self, backend_index: usize, ok: bool) {
        if let Some(backend) = self.backends.get_mut(backend_index) {
            backend.observe_probe(ok, self.config.health_threshold);
        }
    }

    pub fn backend_address(&self, backend_index: usize) -> Option<&str> {
        self.backends.get(backend_index).map(|b| b.address.as_str())
    }

    pub fn stats_snapshot(&self) -> RuntimeStatsSnapshot {
        self.stats.snapshot()
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

impl<V: ExtensionVm> sk_registry::RuntimeHandle for ProxyRuntime<V> {
    fn teardown(&mut self) {
        for backend in &mut self.backends {
            backend.circuit = CircuitState::Closed;
        }
    }

    fn stats(&self) -> RuntimeStatsSnapshot {
        self.stats_snapshot()
    }

    /// A proxy never holds a direct connection itself; it only tracks
    /// backend health. Report the count of currently-available backends.
    fn connection_count(&self) -> usize {
        self.backends.iter().filter(|b| b.healthy && !matches!(b.circuit, CircuitState::Open(_))).count()
    }

    fn deliver_pubsub(&mut self, channel: &str, message: &[u8]) -> bool {
        ProxyRuntime::deliver_pubsub(self, channel, message)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
