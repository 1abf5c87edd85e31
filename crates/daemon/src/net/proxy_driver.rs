// SPDX-License-Identifier: MIT

//! Wires a [`sk_runtimes::proxy::ProxyRuntime`] to real fds (spec
//! §4.5). `ProxyRuntime` only ever hands back backend *selections* —
//! it has no `feed()` — so this driver owns the byte relay itself:
//! accept a client, dial the chosen backend, then pump reads from
//! each side straight into a write on the other.

use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sk_core::RuntimeName;
use sk_reactor::{Completion, Reactor};
use sk_registry::RuntimeConfig;
use sk_runtimes::extension::NullVm;
use sk_runtimes::proxy::{ProxyConfig, ProxyProtocol, ProxyRuntime, Strategy};
use sk_runtimes::AnyRuntime;
use tracing::warn;

use super::{connection, NetDriver, Shared};

pub(super) fn start(driver: &mut NetDriver, name: &RuntimeName, config: &RuntimeConfig) -> Result<(), String> {
    if config.backends.is_empty() {
        return Err("proxy runtime needs at least one backend".to_string());
    }
    let fd = connection::bind_listener(config.port).map_err(|e| e.to_string())?;

    let strategy = match config.strategy.as_deref() {
        Some("random") => Strategy::Random,
        Some("script") => Strategy::Script,
        _ => Strategy::RoundRobin,
    };
    let protocol = if config.protocol.as_deref() == Some("http") { ProxyProtocol::Http } else { ProxyProtocol::Tcp };
    let proxy_config = ProxyConfig {
        protocol,
        strategy,
        retry_all: true,
        health_threshold: 3,
        circuit_threshold: 5,
        circuit_timeout_ms: 30_000,
        retry_count: 2,
        route_prefixes: Vec::new(),
    };
    let runtime = ProxyRuntime::new(proxy_config, NullVm, config.backends.clone());
    driver.shared.registry.install_handle(name.as_str(), AnyRuntime::Proxy(runtime), super::now_ms()).map_err(|e| e.to_string())?;
    driver.shared.track_listener(name, fd);

    let completion = AcceptCompletion { shared: driver.shared.clone(), name: name.clone(), listen_fd: fd };
    driver.reactor.submit_accept(fd, Box::new(completion)).map_err(|e| e.to_string())?;
    Ok(())
}

struct AcceptCompletion {
    shared: Arc<Shared>,
    name: RuntimeName,
    listen_fd: RawFd,
}

impl Completion for AcceptCompletion {
    fn on_completion(self: Box<Self>, reactor: &mut Reactor, result: i32, flags: u32) {
        if result >= 0 {
            let client_fd = result as RawFd;
            // SAFETY: fd just accepted by this completion.
            unsafe { libc::fcntl(client_fd, libc::F_SETFL, libc::O_NONBLOCK) };
            dial_backend(reactor, self.shared.clone(), self.name.clone(), client_fd);
        } else if result != -libc::ECANCELED {
            warn!(runtime = self.name.as_str(), result, "proxy accept failed");
        }

        if !io_uring::cqueue::more(flags) && result != -libc::ECANCELED {
            let next = AcceptCompletion { shared: self.shared.clone(), name: self.name.clone(), listen_fd: self.listen_fd };
            if let Err(e) = reactor.submit_accept(self.listen_fd, Box::new(next)) {
                warn!(runtime = self.name.as_str(), "failed to re-arm proxy accept: {e}");
            }
        }
    }
}

fn dial_backend(reactor: &mut Reactor, shared: Arc<Shared>, name: RuntimeName, client_fd: RawFd) {
    let now = super::now_ms();
    let picked = shared.registry.with_handle_mut(name.as_str(), |any| {
        let proxy = any.as_proxy_mut()?;
        let idx = proxy.select(now)?;
        proxy.backend_address(idx).map(|addr| (idx, addr.to_string()))
    });
    let Ok(Some((backend_index, addr))) = picked else {
        warn!(runtime = name.as_str(), "no available backend, dropping connection");
        connection::cancel_then_close(reactor, client_fd);
        return;
    };
    let Ok(addr) = addr.parse::<std::net::SocketAddr>() else {
        warn!(runtime = name.as_str(), backend = addr.as_str(), "unparseable backend address");
        connection::cancel_then_close(reactor, client_fd);
        return;
    };
    let backend_fd = match connection::new_connect_socket() {
        Ok(fd) => fd,
        Err(e) => {
            warn!(runtime = name.as_str(), "failed to open backend socket: {e}");
            connection::cancel_then_close(reactor, client_fd);
            return;
        }
    };
    shared.track_connection(&name, client_fd);
    shared.track_connection(&name, backend_fd);
    let completion = BackendConnectCompletion { shared, name, client_fd, backend_fd, backend_index };
    if let Err(e) = reactor.submit_connect(backend_fd, &addr, Box::new(completion)) {
        warn!("failed to submit backend connect: {e}");
    }
}

struct BackendConnectCompletion {
    shared: Arc<Shared>,
    name: RuntimeName,
    client_fd: RawFd,
    backend_fd: RawFd,
    backend_index: usize,
}

impl Completion for BackendConnectCompletion {
    fn on_completion(self: Box<Self>, reactor: &mut Reactor, result: i32, _flags: u32) {
        let now = super::now_ms();
        let ok = result == 0;
        let _ = self.shared.registry.with_handle_mut(self.name.as_str(), |any| {
            if let Some(proxy) = any.as_proxy_mut() {
                proxy.record_request_result(self.backend_index, ok, now);
            }
        });
        if !ok {
            warn!(runtime = self.name.as_str(), result, "backend connect failed");
            let closed = Arc::new(AtomicBool::new(false));
            teardown_pair(reactor, &self.shared, &self.name, self.client_fd, self.backend_fd, &closed);
            return;
        }
        let closed = Arc::new(AtomicBool::new(false));
        arm_relay(reactor, self.shared.clone(), self.name.clone(), self.client_fd, self.backend_fd, closed.clone());
        arm_relay(reactor, self.shared.clone(), self.name.clone(), self.backend_fd, self.client_fd, closed);
    }
}

/// Read from `src`, write whatever arrives to `dst`; re-arms itself on
/// every pass. Either side closing tears down both fds — no fd should
/// outlive the connection it belongs to — so `closed` is shared
/// between both relay directions of a pair: a failure observed on one
/// side must not double-close fds already torn down by the other.
fn arm_relay(reactor: &mut Reactor, shared: Arc<Shared>, name: RuntimeName, src: RawFd, dst: RawFd, closed: Arc<AtomicBool>) {
    let mut buf = vec![0u8; connection::BUF_GROUP_LEN].into_boxed_slice();
    let entry_buf: *mut [u8] = &mut *buf;
    // SAFETY: see server_driver::arm_read.
    let slice = unsafe { &mut *entry_buf };
    let completion = RelayReadCompletion { shared, name, src, dst, closed, buf };
    if let Err(e) = reactor.submit_read(src, slice, Box::new(completion)) {
        warn!("failed to submit proxy relay read: {e}");
    }
}

struct RelayReadCompletion {
    shared: Arc<Shared>,
    name: RuntimeName,
    src: RawFd,
    dst: RawFd,
    closed: Arc<AtomicBool>,
    #[allow(dead_code)]
    buf: Box<[u8]>,
}

impl Completion for RelayReadCompletion {
    fn on_completion(self: Box<Self>, reactor: &mut Reactor, result: i32, _flags: u32) {
        if result <= 0 {
            teardown_pair(reactor, &self.shared, &self.name, self.src, self.dst, &self.closed);
            return;
        }
        let n = result as usize;
        let completion = RelayWriteCompletion {
            shared: self.shared.clone(),
            name: self.name.clone(),
            src: self.src,
            dst: self.dst,
            closed: self.closed.clone(),
            buf: self.buf[..n].to_vec(),
        };
        let slice_ptr: *const [u8] = &*completion.buf;
        // SAFETY: `completion.buf` stays alive inside the completion
        // until the write finishes.
        let slice = unsafe { &*slice_ptr };
        if let Err(e) = reactor.submit_write(self.dst, slice, Box::new(completion)) {
            warn!("failed to submit proxy relay write: {e}");
        }
    }
}

struct RelayWriteCompletion {
    shared: Arc<Shared>,
    name: RuntimeName,
    src: RawFd,
    dst: RawFd,
    closed: Arc<AtomicBool>,
    buf: Vec<u8>,
}

impl Completion for RelayWriteCompletion {
    fn on_completion(self: Box<Self>, reactor: &mut Reactor, result: i32, _flags: u32) {
        if result < 0 {
            warn!(dst = self.dst, result, "proxy relay write failed");
            teardown_pair(reactor, &self.shared, &self.name, self.src, self.dst, &self.closed);
            return;
        }
        arm_relay(reactor, self.shared, self.name, self.src, self.dst, self.closed);
    }
}

fn teardown_pair(reactor: &mut Reactor, shared: &Arc<Shared>, name: &RuntimeName, a: RawFd, b: RawFd, closed: &Arc<AtomicBool>) {
    if closed.swap(true, Ordering::AcqRel) {
        return;
    }
    shared.untrack_connection(name, a);
    shared.untrack_connection(name, b);
    connection::cancel_then_close(reactor, a);
    connection::cancel_then_close(reactor, b);
}
