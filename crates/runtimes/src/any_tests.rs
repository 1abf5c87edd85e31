// SPDX-License-Identifier: MIT

use super::*;
use crate::cache::{CacheConfig, CacheMode, EvictionPolicy};
use crate::client::{ClientConfig, ReconnectPolicy};
use crate::proxy::{ProxyConfig, ProxyProtocol, Strategy};
use crate::server::{ServerConfig, ServerMode};
use sk_core::RuntimeKind;

fn server() -> AnyRuntime {
    AnyRuntime::Server(ServerRuntime::new(
        ServerConfig {
            mode: ServerMode::InOut,
            max_connections: 10,
            rate_limit_per_sec: None,
            server_rate_limit_per_sec: None,
            http_root: None,
            write_high_water_mark: 1 << 20,
        },
        NullVm,
        SystemClock,
    ))
}

fn cache() -> AnyRuntime {
    AnyRuntime::Cache(CacheRuntime::new(
        CacheConfig {
            mode: CacheMode::ReadWrite,
            eviction: EvictionPolicy::NoEviction,
            max_memory: None,
            snapshot_path: None,
            replicate_target: None,
            force_resp2: false,
        },
        NullVm,
    ))
}

fn client() -> AnyRuntime {
    AnyRuntime::Client(ClientRuntime::new(
        ClientConfig { reconnect: ReconnectPolicy::disabled(), write_high_water_mark: 1 << 20 },
        NullVm,
    ))
}

fn proxy() -> AnyRuntime {
    AnyRuntime::Proxy(ProxyRuntime::new(
        ProxyConfig {
            protocol: ProxyProtocol::Tcp,
            strategy: Strategy::RoundRobin,
            retry_all: false,
            health_threshold: 3,
            circuit_threshold: 3,
            circuit_timeout_ms: 1000,
            retry_count: 0,
            route_prefixes: Vec::new(),
        },
        NullVm,
        vec!["127.0.0.1:1".into()],
    ))
}

#[test]
fn kind_matches_the_wrapped_variant() {
    assert_eq!(server().kind(), RuntimeKind::Server);
    assert_eq!(cache().kind(), RuntimeKind::Cache);
    assert_eq!(client().kind(), RuntimeKind::Client);
    assert_eq!(proxy().kind(), RuntimeKind::Proxy);
}

#[test]
fn downcasting_only_succeeds_for_the_matching_variant() {
    let mut s = server();
    assert!(s.as_server_mut().is_some());
    assert!(s.as_cache_mut().is_none());
    assert!(s.as_client_mut().is_none());
    assert!(s.as_proxy_mut().is_none());
}

#[test]
fn teardown_and_connection_count_delegate_through_every_variant() {
    for mut runtime in [server(), cache(), client(), proxy()] {
        assert_eq!(runtime.connection_count(), if matches!(runtime, AnyRuntime::Proxy(_)) { 1 } else { 0 });
        runtime.teardown();
    }
}

#[test]
fn deliver_pubsub_with_no_subscription_returns_false() {
    let mut c = cache();
    assert!(!c.deliver_pubsub("channel", b"msg"));
}
