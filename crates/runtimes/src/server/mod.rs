// SPDX-License-Identifier: MIT

//! The server runtime: binds a listen port in spirit (the reactor owns
//! the actual fd and accept loop; this runtime only ever sees bytes in
//! and bytes out per connection), discriminates
//! HTTP/WebSocket/raw-bytes mode on first byte, and fans inbound
//! traffic out through the extension VM according to its configured
//! mode.

mod connection;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use sk_core::{Clock, RuntimeStats, RuntimeStatsSnapshot, SystemClock};
use sk_net::http;
use sk_net::ws::{self, Opcode};
use sk_net::WsError;

use crate::base::TokenBucket;
use crate::extension::{ConnCtx, ExtensionVm, NullVm};

pub use connection::{detect_protocol, ConnectionState, Protocol};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    In,
    Out,
    InOut,
    Master,
}

pub struct ServerConfig {
    pub mode: ServerMode,
    pub max_connections: usize,
    pub rate_limit_per_sec: Option<f64>,
    pub server_rate_limit_per_sec: Option<f64>,
    pub http_root: Option<PathBuf>,
    pub write_high_water_mark: usize,
}

/// Bytes produced by a [`ServerRuntime::feed`] call: frames the caller
/// writes straight back to this runtime's own sockets, plus routed
/// deliveries bound for a connection on another named runtime —
/// resolving the name crosses into the registry, which this runtime
/// has no handle to, so the daemon wiring layer carries these the rest
/// of the way.
#[derive(Debug, Default)]
pub struct FeedOutput {
    pub direct: Vec<(u64, Vec<u8>)>,
    pub routed: Vec<(String, Vec<u8>)>,
}

pub struct ServerRuntime<V: ExtensionVm = NullVm, C: Clock = SystemClock> {
    config: ServerConfig,
    vm: V,
    clock: C,
    connections: HashMap<u64, ConnectionState>,
    server_bucket: Option<TokenBucket>,
    stats: RuntimeStats,
}

impl<V: ExtensionVm, C: Clock> ServerRuntime<V, C> {
    pub fn new(config: ServerConfig, vm: V, clock: C) -> Self {
        let server_bucket = config.server_rate_limit_per_sec.map(|rate| TokenBucket::new(rate, &clock));
        Self { config, vm, clock, connections: HashMap::new(), server_bucket, stats: RuntimeStats::default() }
    }

    /// Admits a newly accepted connection, rejecting past
    /// `max_connections` — excess accept completions close the fd and
    /// increment a drop counter.
    pub fn accept(&mut self, connection_id: u64) -> bool {
        if self.connections.len() >= self.config.max_connections {
            self.stats.connections_rejected.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        let mut state = ConnectionState::new(self.config.write_high_water_mark);
        if let Some(rate) = self.config.rate_limit_per_sec {
            state.meta.rate_limit = Some(TokenBucket::new(rate, &self.clock));
        }
        self.stats.on_connect();
        let ctx = ConnCtx { connection_id, metadata: &state.meta.metadata };
        self.vm.on_connect(&ctx);
        self.connections.insert(connection_id, state);
        true
    }

    pub fn disconnect(&mut self, connection_id: u64) {
        if let Some(state) = self.connections.remove(&connection_id) {
            self.stats.on_disconnect();
            let ctx = ConnCtx { connection_id, metadata: &state.meta.metadata };
            self.vm.on_disconnect(&ctx);
        }
    }

    /// Routes a connection's subsequent inbound bytes to another named
    /// server runtime.
    pub fn route(&mut self, connection_id: u64, target: Option<String>) -> bool {
        let Some(state) = self.connections.get_mut(&connection_id) else { return false };
        state.meta.routed_to = target;
        true
    }

    /// Feed inbound bytes for `connection_id`.
    pub fn feed(&mut self, connection_id: u64, bytes: &[u8]) -> FeedOutput {
        let mut out = FeedOutput::default();
        let Some(mut state) = self.connections.remove(&connection_id) else { return out };
        state.inbox.extend_from_slice(bytes);
        self.stats.on_message_in(bytes.len() as u64);

        if state.protocol == Protocol::Undetermined {
            if state.inbox.len() < 4 {
                self.connections.insert(connection_id, state);
                return out;
            }
            state.protocol = detect_protocol(&state.inbox);
        }

        match state.protocol {
            Protocol::Http => self.process_http(connection_id, &mut state, &mut out),
            Protocol::WebSocket => self.process_websocket(connection_id, &mut state, &mut out),
            Protocol::RawBytes => self.process_raw(connection_id, &mut state, &mut out),
            Protocol::Undetermined => {}
        }

        self.connections.insert(connection_id, state);
        out
    }

    pub fn tick(&mut self) {
        self.vm.on_tick();
    }

    pub fn stats_snapshot(&self) -> RuntimeStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn deliver_pubsub(&mut self, channel: &str, message: &[u8]) -> bool {
        if self.vm.subscriptions().iter().any(|c| c == channel) {
            self.vm.on_publish(channel, message);
            true
        } else {
            false
        }
    }

    fn process_http(&mut self, connection_id: u64, state: &mut ConnectionState, out: &mut FeedOutput) {
        match ws::parse_upgrade_request(&state.inbox) {
            Ok(Some(key)) => {
                state.inbox.clear();
                state.protocol = Protocol::WebSocket;
                out.direct.push((connection_id, ws::build_handshake_response(&key)));
                return;
            }
            Ok(None) => return,
            Err(WsError::NotAnUpgrade) => {}
            Err(_) => {
                state.inbox.clear();
                out.direct.push((connection_id, http::not_found()));
                return;
            }
        }

        match http::parse_request(&state.inbox) {
            Ok(Some((req, consumed))) => {
                state.inbox.drain(..consumed);
                let method_str = match req.method {
                    http::Method::Get => "GET",
                    http::Method::Post => "POST",
                    http::Method::Head => "HEAD",
                };
                let ctx = ConnCtx { connection_id, metadata: &state.meta.metadata };
                self.vm.on_http_request(&ctx, method_str, &req.path);
                let response = match &self.config.http_root {
                    Some(root) => serve_static(root, &req.path),
                    None => http::not_found(),
                };
                out.direct.push((connection_id, response));
            }
            Ok(None) => {}
            Err(_) => {
                state.inbox.clear();
                out.direct.push((connection_id, http::not_found()));
            }
        }
    }

    fn process_websocket(&mut self, connection_id: u64, state: &mut ConnectionState, out: &mut FeedOutput) {
        loop {
            match ws::decode_frame(&state.inbox) {
                Ok(Some((frame, consumed))) => {
                    state.inbox.drain(..consumed);
                    match frame.opcode {
                        Opcode::Close => out.direct.push((connection_id, ws::encode_frame(Opcode::Close, &[]))),
                        Opcode::Ping => out.direct.push((connection_id, ws::encode_frame(Opcode::Pong, &frame.payload))),
                        Opcode::Pong | Opcode::Continuation => {}
                        Opcode::Text | Opcode::Binary => {
                            if self.rate_limited(state) {
                                continue;
                            }
                            if matches!(self.config.mode, ServerMode::In | ServerMode::InOut | ServerMode::Master) {
                                let ctx = ConnCtx { connection_id, metadata: &state.meta.metadata };
                                self.vm.on_websocket(&ctx, &frame.payload);
                            }
                            if matches!(self.config.mode, ServerMode::Out | ServerMode::InOut) {
                                let frame_bytes = ws::encode_frame(frame.opcode, &frame.payload);
                                self.broadcast(connection_id, frame_bytes, out);
                            }
                            if let Some(target) = state.meta.routed_to.clone() {
                                out.routed.push((target, frame.payload.clone()));
                            }
                        }
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    state.inbox.clear();
                    break;
                }
            }
        }
    }

    fn process_raw(&mut self, connection_id: u64, state: &mut ConnectionState, out: &mut FeedOutput) {
        if state.inbox.is_empty() {
            return;
        }
        let payload = std::mem::take(&mut state.inbox);
        if self.rate_limited(state) {
            return;
        }
        if matches!(self.config.mode, ServerMode::In | ServerMode::InOut | ServerMode::Master) {
            let ctx = ConnCtx { connection_id, metadata: &state.meta.metadata };
            self.vm.on_message(&ctx, &payload);
        }
        if matches!(self.config.mode, ServerMode::Out | ServerMode::InOut) {
            self.broadcast(connection_id, payload.clone(), out);
        }
        if let Some(target) = state.meta.routed_to.clone() {
            out.routed.push((target, payload));
        }
    }

    /// `true` if either the per-connection or per-server token bucket
    /// rejected the message.
    fn rate_limited(&mut self, state: &mut ConnectionState) -> bool {
        if let Some(bucket) = state.meta.rate_limit.as_mut() {
            if !bucket.try_consume(&self.clock) {
                self.stats.submissions_dropped.fetch_add(1, Ordering::Relaxed);
                return true;
            }
        }
        if let Some(bucket) = self.server_bucket.as_mut() {
            if !bucket.try_consume(&self.clock) {
                self.stats.submissions_dropped.fetch_add(1, Ordering::Relaxed);
                return true;
            }
        }
        false
    }

    /// Writes an already-encoded frame to every other open connection;
    /// `sender_id`'s own socket is excluded since it already has the
    /// message it just sent.
    fn broadcast(&mut self, sender_id: u64, frame: Vec<u8>, out: &mut FeedOutput) {
        for &id in self.connections.keys() {
            if id != sender_id {
                out.direct.push((id, frame.clone()));
            }
        }
        self.stats.on_message_out(frame.len() as u64);
    }
}

impl<V: ExtensionVm, C: Clock> sk_registry::RuntimeHandle for ServerRuntime<V, C> {
    fn teardown(&mut self) {
        self.connections.clear();
    }

    fn stats(&self) -> RuntimeStatsSnapshot {
        self.stats_snapshot()
    }

    fn connection_count(&self) -> usize {
        ServerRuntime::connection_count(self)
    }

    fn deliver_pubsub(&mut self, channel: &str, message: &[u8]) -> bool {
        ServerRuntime::deliver_pubsub(self, channel, message)
    }
}

/// Serves a static file under `root` for HTTP static mode.
fn serve_static(root: &Path, url_path: &str) -> Vec<u8> {
    let Some(resolved) = http::resolve_under_root(root, url_path) else {
        return http::not_found();
    };
    match std::fs::read(&resolved) {
        Ok(body) => {
            let content_type = http::content_type_for(&resolved);
            http::build_response(200, "OK", content_type, &body)
        }
        Err(_) => http::not_found(),
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
