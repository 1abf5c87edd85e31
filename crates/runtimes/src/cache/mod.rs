// SPDX-License-Identifier: MIT

//! The cache runtime: a keyspace plus two wire protocols, served on
//! the same fd and auto-detected by first byte.

pub mod commands;
pub mod keyspace;
pub mod snapshot;
pub mod value;

use std::path::PathBuf;

use sk_core::RuntimeStatsSnapshot;
use sk_net::cache_proto::{self, WireMode};

use crate::extension::{ExtensionVm, NullVm};

pub use commands::Reply;
pub use keyspace::{CacheMode, EvictionPolicy, Keyspace};

pub struct CacheConfig {
    pub mode: CacheMode,
    pub eviction: EvictionPolicy,
    pub max_memory: Option<usize>,
    pub snapshot_path: Option<PathBuf>,
    pub replicate_target: Option<String>,
    pub force_resp2: bool,
}

/// Drives the keyspace from raw connection bytes; owns no fd itself —
/// the reactor-facing connection layer feeds it bytes and consumes the
/// bytes it produces in return. Runtime logic never blocks on I/O
/// directly.
pub struct CacheRuntime<V: ExtensionVm = NullVm> {
    config: CacheConfig,
    keyspace: Keyspace,
    vm: V,
    connections: usize,
    stats: RuntimeStats,
}

#[derive(Default)]
struct RuntimeStats {
    commands_total: u64,
    errors_total: u64,
}

impl<V: ExtensionVm> CacheRuntime<V> {
    pub fn new(config: CacheConfig, vm: V) -> Self {
        let keyspace = Keyspace::new(config.max_memory, config.eviction);
        Self { config, keyspace, vm, connections: 0, stats: RuntimeStats::default() }
    }

    pub fn on_connect(&mut self) {
        self.connections += 1;
    }

    pub fn on_disconnect(&mut self) {
        self.connections = self.connections.saturating_sub(1);
    }

    /// Consume as many complete commands as `buf` holds, returning the
    /// encoded replies (in arrival order) and the number of input
    /// bytes consumed. Leaves a trailing partial command in `buf` for
    /// the caller to re-submit once more bytes arrive.
    pub fn feed(&mut self, buf: &[u8], now_ms: u64) -> (Vec<Vec<u8>>, usize) {
        let mut consumed = 0;
        let mut out = Vec::new();
        while consumed < buf.len() {
            let remaining = &buf[consumed..];
            let forced_mode = self.config.force_resp2.then_some(WireMode::Resp2);
            let mode = forced_mode.unwrap_or_else(|| cache_proto::detect_mode(remaining[0]));
            match cache_proto::parse_command(remaining) {
                Ok(Some((args, used))) => {
                    consumed += used;
                    self.stats.commands_total += 1;
                    let (reply, effects) = commands::dispatch(
                        &mut self.keyspace,
                        self.config.mode,
                        self.config.snapshot_path.as_deref(),
                        &args,
                        now_ms,
                    );
                    if matches!(reply, Reply::Error(_)) {
                        self.stats.errors_total += 1;
                    }
                    if let Some((channel, message)) = effects.publish {
                        self.vm.on_publish(&channel, &message);
                    }
                    out.push(encode(&reply, mode));
                }
                Ok(None) => break,
                Err(e) => {
                    out.push(encode(&Reply::Error(e.to_string()), mode));
                    break;
                }
            }
        }
        (out, consumed)
    }

    /// Runs one active-expiry sampling pass; the daemon's tick loop
    /// calls this, not the reactor directly.
    pub fn tick(&mut self, now_ms: u64) {
        self.keyspace.sample_expire(20, now_ms);
        self.vm.on_tick();
    }

    pub fn stats_snapshot(&self) -> RuntimeStatsSnapshot {
        RuntimeStatsSnapshot {
            connections_current: self.connections as u64,
            messages_in: self.stats.commands_total,
            submissions_dropped: self.stats.errors_total,
            ..Default::default()
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections
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

impl<V: ExtensionVm> sk_registry::RuntimeHandle for CacheRuntime<V> {
    fn teardown(&mut self) {
        self.connections = 0;
    }

    fn stats(&self) -> RuntimeStatsSnapshot {
        self.stats_snapshot()
    }

    fn connection_count(&self) -> usize {
        self.connections
    }

    fn deliver_pubsub(&mut self, channel: &str, message: &[u8]) -> bool {
        CacheRuntime::deliver_pubsub(self, channel, message)
    }
}

fn encode(reply: &Reply, mode: WireMode) -> Vec<u8> {
    match mode {
        WireMode::Resp2 => encode_resp2(reply),
        WireMode::Inline => encode_inline(reply),
    }
}

fn encode_resp2(reply: &Reply) -> Vec<u8> {
    match reply {
        Reply::Simple(s) => cache_proto::encode_simple_string(s),
        Reply::Error(s) => cache_proto::encode_error(s),
        Reply::Integer(n) => cache_proto::encode_integer(*n),
        Reply::Bulk(v) => cache_proto::encode_bulk_string(v.as_deref()),
        Reply::Array(items) => {
            let mut out = format!("*{}\r\n", items.len()).into_bytes();
            for item in items {
                out.extend_from_slice(&encode_resp2(item));
            }
            out
        }
    }
}

/// Inline replies are plain text lines: `OK`, `NIL`, a decimal integer,
/// or the raw bulk payload, each `\n`-terminated.
fn encode_inline(reply: &Reply) -> Vec<u8> {
    match reply {
        Reply::Simple(s) => format!("{s}\n").into_bytes(),
        Reply::Error(s) => format!("ERR {s}\n").into_bytes(),
        Reply::Integer(n) => format!("{n}\n").into_bytes(),
        Reply::Bulk(None) => b"NIL\n".to_vec(),
        Reply::Bulk(Some(v)) => {
            let mut out = v.clone();
            out.push(b'\n');
            out
        }
        Reply::Array(items) => {
            let mut out = Vec::new();
            for item in items {
                out.extend_from_slice(&encode_inline(item));
            }
            out
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
