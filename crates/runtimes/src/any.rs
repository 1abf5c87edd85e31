// SPDX-License-Identifier: MIT

//! A tagged variant over the four runtime kinds in place of a deep
//! virtual hierarchy — the kind set is closed, so dispatch is a match
//! rather than open-ended extensibility. Every concrete runtime already
//! implements [`sk_registry::RuntimeHandle`] on its own; [`AnyRuntime`]
//! lets the daemon keep a single `Registry<AnyRuntime>` instead of one
//! registry per kind.

use sk_core::{RuntimeStatsSnapshot, SystemClock};
use sk_registry::RuntimeHandle;

use crate::cache::CacheRuntime;
use crate::client::ClientRuntime;
use crate::extension::NullVm;
use crate::proxy::ProxyRuntime;
use crate::server::ServerRuntime;

pub enum AnyRuntime {
    Server(ServerRuntime<NullVm, SystemClock>),
    Client(ClientRuntime<NullVm>),
    Proxy(ProxyRuntime<NullVm>),
    Cache(CacheRuntime<NullVm>),
}

impl AnyRuntime {
    pub fn as_server_mut(&mut self) -> Option<&mut ServerRuntime<NullVm, SystemClock>> {
        match self {
            AnyRuntime::Server(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_client_mut(&mut self) -> Option<&mut ClientRuntime<NullVm>> {
        match self {
            AnyRuntime::Client(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_proxy_mut(&mut self) -> Option<&mut ProxyRuntime<NullVm>> {
        match self {
            AnyRuntime::Proxy(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_cache_mut(&mut self) -> Option<&mut CacheRuntime<NullVm>> {
        match self {
            AnyRuntime::Cache(r) => Some(r),
            _ => None,
        }
    }

    pub fn kind(&self) -> sk_core::RuntimeKind {
        match self {
            AnyRuntime::Server(_) => sk_core::RuntimeKind::Server,
            AnyRuntime::Client(_) => sk_core::RuntimeKind::Client,
            AnyRuntime::Proxy(_) => sk_core::RuntimeKind::Proxy,
            AnyRuntime::Cache(_) => sk_core::RuntimeKind::Cache,
        }
    }
}

impl RuntimeHandle for AnyRuntime {
    fn teardown(&mut self) {
        match self {
            AnyRuntime::Server(r) => r.teardown(),
            AnyRuntime::Client(r) => r.teardown(),
            AnyRuntime::Proxy(r) => r.teardown(),
            AnyRuntime::Cache(r) => r.teardown(),
        }
    }

    fn stats(&self) -> RuntimeStatsSnapshot {
        match self {
            AnyRuntime::Server(r) => r.stats_snapshot(),
            AnyRuntime::Client(r) => r.stats_snapshot(),
            AnyRuntime::Proxy(r) => r.stats_snapshot(),
            AnyRuntime::Cache(r) => r.stats_snapshot(),
        }
    }

    fn connection_count(&self) -> usize {
        match self {
            AnyRuntime::Server(r) => r.connection_count(),
            AnyRuntime::Client(r) => r.connection_count(),
            AnyRuntime::Proxy(r) => r.connection_count(),
            AnyRuntime::Cache(r) => r.connection_count(),
        }
    }

    fn deliver_pubsub(&mut self, channel: &str, message: &[u8]) -> bool {
        match self {
            AnyRuntime::Server(r) => r.deliver_pubsub(channel, message),
            AnyRuntime::Client(r) => r.deliver_pubsub(channel, message),
            AnyRuntime::Proxy(r) => r.deliver_pubsub(channel, message),
            AnyRuntime::Cache(r) => r.deliver_pubsub(channel, message),
        }
    }
}

#[cfg(test)]
#[path = "any_tests.rs"]
mod tests;
