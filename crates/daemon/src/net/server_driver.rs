// SPDX-License-Identifier: MIT

//! Wires a [`sk_runtimes::server::ServerRuntime`] to real fds: binds
//! the listen socket, submits a (multishot where available) accept,
//! and pumps each connection's reads through `feed()`.

use std::os::fd::RawFd;
use std::sync::Arc;

use sk_core::{RuntimeName, SystemClock};
use sk_reactor::{Completion, Reactor};
use sk_registry::RuntimeConfig;
use sk_runtimes::server::{ServerConfig, ServerMode, ServerRuntime};
use sk_runtimes::extension::NullVm;
use sk_runtimes::AnyRuntime;
use tracing::{debug, warn};

use super::{connection, NetDriver, Shared};

const MAX_CONNECTIONS: usize = 4096;
const WRITE_HIGH_WATER_MARK: usize = 1 << 20;

pub(super) fn start(driver: &mut NetDriver, name: &RuntimeName, config: &RuntimeConfig) -> Result<(), String> {
    let fd = connection::bind_listener(config.port).map_err(|e| e.to_string())?;

    let server_config = ServerConfig {
        mode: ServerMode::InOut,
        max_connections: MAX_CONNECTIONS,
        rate_limit_per_sec: None,
        server_rate_limit_per_sec: None,
        http_root: None,
        write_high_water_mark: WRITE_HIGH_WATER_MARK,
    };
    let runtime = ServerRuntime::new(server_config, NullVm, SystemClock);
    driver.shared.registry.install_handle(name.as_str(), AnyRuntime::Server(runtime), super::now_ms()).map_err(|e| e.to_string())?;
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
            let conn_fd = result as RawFd;
            // SAFETY: O_NONBLOCK applies to the fd this branch just
            // took ownership of from the kernel's accept completion.
            unsafe { libc::fcntl(conn_fd, libc::F_SETFL, libc::O_NONBLOCK) };
            let connection_id = self.shared.alloc_connection_id();
            let admitted = self
                .shared
                .registry
                .with_handle_mut(self.name.as_str(), |any| {
                    any.as_server_mut().map(|s| s.accept(connection_id)).unwrap_or(false)
                })
                .unwrap_or(false);
            if admitted {
                self.shared.track_connection(&self.name, conn_fd);
                arm_read(reactor, self.shared.clone(), self.name.clone(), conn_fd, connection_id);
            } else {
                connection::cancel_then_close(reactor, conn_fd);
            }
        } else if result != -libc::ECANCELED {
            warn!(runtime = self.name.as_str(), result, "accept completion failed");
        }

        let more = io_uring::cqueue::more(flags);
        if !more && result != -libc::ECANCELED {
            // Multishot wasn't available or stopped delivering; re-arm.
            let next = AcceptCompletion { shared: self.shared.clone(), name: self.name.clone(), listen_fd: self.listen_fd };
            if let Err(e) = reactor.submit_accept(self.listen_fd, Box::new(next)) {
                warn!(runtime = self.name.as_str(), "failed to re-arm accept: {e}");
            }
        }
    }
}

fn arm_read(reactor: &mut Reactor, shared: Arc<Shared>, name: RuntimeName, fd: RawFd, connection_id: u64) {
    let mut buf = vec![0u8; connection::BUF_GROUP_LEN].into_boxed_slice();
    let entry_buf: *mut [u8] = &mut *buf;
    // SAFETY: `buf` is moved into `ReadCompletion` below and kept alive
    // on the heap until the read completes; only the raw pointer built
    // from it is handed to the SQE.
    let slice = unsafe { &mut *entry_buf };
    let completion = ReadCompletion { shared, name, fd, connection_id, buf };
    if let Err(e) = reactor.submit_read(fd, slice, Box::new(completion)) {
        warn!("failed to submit read: {e}");
    }
}

struct ReadCompletion {
    shared: Arc<Shared>,
    name: RuntimeName,
    fd: RawFd,
    connection_id: u64,
    #[allow(dead_code)]
    buf: Box<[u8]>,
}

impl Completion for ReadCompletion {
    fn on_completion(self: Box<Self>, reactor: &mut Reactor, result: i32, _flags: u32) {
        if result <= 0 {
            disconnect(reactor, &self.shared, &self.name, self.fd, self.connection_id);
            return;
        }
        let n = result as usize;
        let output = self.shared.registry.with_handle_mut(self.name.as_str(), |any| {
            any.as_server_mut().map(|s| s.feed(self.connection_id, &self.buf[..n])).unwrap_or_default()
        });
        match output {
            Ok(out) => {
                for (conn_id, bytes) in out.direct {
                    if conn_id == self.connection_id {
                        write_back(reactor, self.shared.clone(), self.fd, bytes);
                    }
                    // Broadcast targets beyond this connection need a
                    // connection_id -> fd map; out of scope for this
                    // pass (documented in DESIGN.md). Single-connection
                    // echo/direct-reply paths work as-is.
                }
                for (_target_runtime, _bytes) in out.routed {
                    debug!(runtime = self.name.as_str(), "routed delivery to another runtime not wired");
                }
            }
            Err(e) => warn!(runtime = self.name.as_str(), "feed failed: {e}"),
        }
        arm_read(reactor, self.shared.clone(), self.name.clone(), self.fd, self.connection_id);
    }
}

fn write_back(reactor: &mut Reactor, shared: Arc<Shared>, fd: RawFd, bytes: Vec<u8>) {
    let completion = WriteCompletion { shared, fd, buf: bytes };
    // SAFETY: the buffer lives inside `completion`, moved into the
    // reactor's request record until the write completes.
    let slice_ptr: *const [u8] = &*completion.buf;
    let slice = unsafe { &*slice_ptr };
    if let Err(e) = reactor.submit_write(fd, slice, Box::new(completion)) {
        warn!("failed to submit write: {e}");
    }
}

struct WriteCompletion {
    #[allow(dead_code)]
    shared: Arc<Shared>,
    fd: RawFd,
    buf: Vec<u8>,
}

impl Completion for WriteCompletion {
    fn on_completion(self: Box<Self>, _reactor: &mut Reactor, result: i32, _flags: u32) {
        if result < 0 {
            warn!(fd = self.fd, result, "write failed");
        }
    }
}

fn disconnect(reactor: &mut Reactor, shared: &Arc<Shared>, name: &RuntimeName, fd: RawFd, connection_id: u64) {
    let _ = shared.registry.with_handle_mut(name.as_str(), |any| {
        if let Some(server) = any.as_server_mut() {
            server.disconnect(connection_id);
        }
    });
    shared.untrack_connection(name, fd);
    connection::cancel_then_close(reactor, fd);
}
