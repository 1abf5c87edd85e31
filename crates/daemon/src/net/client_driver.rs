// SPDX-License-Identifier: MIT

//! Wires a [`sk_runtimes::client::ClientRuntime`] to a real outbound
//! fd: async connect, then a read loop plus a periodic drain of the
//! runtime's write queue. On disconnect, the runtime's backoff policy
//! schedules the next connect attempt via a reactor timeout instead
//! of blocking the thread.

use std::net::SocketAddr;
use std::os::fd::RawFd;
use std::sync::Arc;

use sk_core::RuntimeName;
use sk_reactor::{AbsoluteTimespec, Completion, Reactor};
use sk_registry::RuntimeConfig;
use sk_runtimes::client::{ClientConfig, ClientRuntime, ReconnectPolicy};
use sk_runtimes::extension::NullVm;
use sk_runtimes::AnyRuntime;
use tracing::warn;

use super::{connection, NetDriver, Shared};

const WRITE_HIGH_WATER_MARK: usize = 1 << 20;

pub(super) fn start(driver: &mut NetDriver, name: &RuntimeName, config: &RuntimeConfig) -> Result<(), String> {
    let target = config.upstreams.first().ok_or_else(|| "client runtime needs an upstream address".to_string())?;
    let addr: SocketAddr = target.parse().map_err(|e| format!("invalid upstream address {target:?}: {e}"))?;

    let client_config = ClientConfig { reconnect: ReconnectPolicy::infinite(), write_high_water_mark: WRITE_HIGH_WATER_MARK };
    let runtime = ClientRuntime::new(client_config, NullVm);
    driver.shared.registry.install_handle(name.as_str(), AnyRuntime::Client(runtime), super::now_ms()).map_err(|e| e.to_string())?;

    begin_connect(&mut driver.reactor, driver.shared.clone(), name.clone(), addr);
    Ok(())
}

fn begin_connect(reactor: &mut Reactor, shared: Arc<Shared>, name: RuntimeName, addr: SocketAddr) {
    let fd = match connection::new_connect_socket() {
        Ok(fd) => fd,
        Err(e) => {
            warn!(runtime = name.as_str(), "failed to open client socket: {e}");
            schedule_reconnect(reactor, shared, name, addr);
            return;
        }
    };
    let _ = shared.registry.with_handle_mut(name.as_str(), |any| {
        if let Some(client) = any.as_client_mut() {
            client.begin_connect();
        }
    });
    shared.track_listener(&name, fd); // reuses the single-fd slot; clients have no separate listener.
    let completion = ConnectCompletion { shared, name, fd, addr };
    match reactor.submit_connect(fd, &addr, Box::new(completion)) {
        Ok(_) => {}
        Err(e) => warn!("failed to submit connect: {e}"),
    }
}

fn schedule_reconnect(reactor: &mut Reactor, shared: Arc<Shared>, name: RuntimeName, addr: SocketAddr) {
    let delay = shared.registry.with_handle_mut(name.as_str(), |any| any.as_client_mut().and_then(|c| c.on_disconnected()));
    let Ok(Some(delay)) = delay else {
        return;
    };
    let at = AbsoluteTimespec { secs: delay.as_secs() as i64, nanos: delay.subsec_nanos() as i64 };
    let completion = ReconnectTimer { shared, name, addr };
    if let Err(e) = reactor.submit_timeout(at, Box::new(completion)) {
        warn!("failed to arm reconnect timer: {e}");
    }
}

struct ConnectCompletion {
    shared: Arc<Shared>,
    name: RuntimeName,
    fd: RawFd,
    addr: SocketAddr,
}

impl Completion for ConnectCompletion {
    fn on_completion(self: Box<Self>, reactor: &mut Reactor, result: i32, _flags: u32) {
        if result == 0 {
            let _ = self.shared.registry.with_handle_mut(self.name.as_str(), |any| {
                if let Some(client) = any.as_client_mut() {
                    client.on_connected();
                }
            });
            self.shared.track_connection(&self.name, self.fd);
            arm_read(reactor, self.shared.clone(), self.name.clone(), self.fd, self.addr);
            drain_writes(reactor, self.shared.clone(), self.name.clone(), self.fd);
        } else {
            warn!(runtime = self.name.as_str(), result, "connect failed");
            // SAFETY: this fd never left this completion's ownership.
            unsafe { libc::close(self.fd) };
            schedule_reconnect(reactor, self.shared.clone(), self.name.clone(), self.addr);
        }
    }
}

struct ReconnectTimer {
    shared: Arc<Shared>,
    name: RuntimeName,
    addr: SocketAddr,
}

impl Completion for ReconnectTimer {
    fn on_completion(self: Box<Self>, reactor: &mut Reactor, _result: i32, _flags: u32) {
        begin_connect(reactor, self.shared, self.name, self.addr);
    }
}

fn arm_read(reactor: &mut Reactor, shared: Arc<Shared>, name: RuntimeName, fd: RawFd, addr: SocketAddr) {
    let mut buf = vec![0u8; connection::BUF_GROUP_LEN].into_boxed_slice();
    let entry_buf: *mut [u8] = &mut *buf;
    // SAFETY: see server_driver::arm_read.
    let slice = unsafe { &mut *entry_buf };
    let completion = ReadCompletion { shared, name, fd, addr, buf };
    if let Err(e) = reactor.submit_read(fd, slice, Box::new(completion)) {
        warn!("failed to submit client read: {e}");
    }
}

struct ReadCompletion {
    shared: Arc<Shared>,
    name: RuntimeName,
    fd: RawFd,
    addr: SocketAddr,
    #[allow(dead_code)]
    buf: Box<[u8]>,
}

impl Completion for ReadCompletion {
    fn on_completion(self: Box<Self>, reactor: &mut Reactor, result: i32, _flags: u32) {
        if result <= 0 {
            handle_disconnect(reactor, self.shared, self.name, self.fd, self.addr);
            return;
        }
        let n = result as usize;
        let _ = self.shared.registry.with_handle_mut(self.name.as_str(), |any| {
            if let Some(client) = any.as_client_mut() {
                client.feed(&self.buf[..n]);
            }
        });
        arm_read(reactor, self.shared.clone(), self.name.clone(), self.fd, self.addr);
        drain_writes(reactor, self.shared.clone(), self.name.clone(), self.fd);
    }
}

fn drain_writes(reactor: &mut Reactor, shared: Arc<Shared>, name: RuntimeName, fd: RawFd) {
    let frames = shared.registry.with_handle_mut(name.as_str(), |any| any.as_client_mut().map(|c| c.drain_writes()));
    if let Ok(Some(frames)) = frames {
        for frame in frames {
            let completion = WriteCompletion { fd, buf: frame };
            let slice_ptr: *const [u8] = &*completion.buf;
            // SAFETY: `completion.buf` stays alive inside the completion
            // until the write finishes.
            let slice = unsafe { &*slice_ptr };
            if let Err(e) = reactor.submit_write(fd, slice, Box::new(completion)) {
                warn!("failed to submit client write: {e}");
            }
        }
    }
}

struct WriteCompletion {
    fd: RawFd,
    buf: Vec<u8>,
}

impl Completion for WriteCompletion {
    fn on_completion(self: Box<Self>, _reactor: &mut Reactor, result: i32, _flags: u32) {
        if result < 0 {
            warn!(fd = self.fd, result, "client write failed");
        }
    }
}

fn handle_disconnect(reactor: &mut Reactor, shared: Arc<Shared>, name: RuntimeName, fd: RawFd, addr: SocketAddr) {
    shared.untrack_connection(&name, fd);
    connection::cancel_then_close(reactor, fd);
    schedule_reconnect(reactor, shared, name, addr);
}
