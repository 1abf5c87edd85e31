// SPDX-License-Identifier: MIT

//! Wires a [`sk_runtimes::cache::CacheRuntime`] to real fds (spec
//! §4.6): same accept/read/write shape as the server driver, but
//! `feed()` returns already-encoded reply frames instead of a
//! per-connection fan-out, since the cache protocol is strict
//! request/response on one connection at a time.

use std::os::fd::RawFd;
use std::sync::Arc;

use sk_core::RuntimeName;
use sk_reactor::{Completion, Reactor};
use sk_registry::RuntimeConfig;
use sk_runtimes::cache::{CacheConfig, CacheMode, CacheRuntime, EvictionPolicy};
use sk_runtimes::extension::NullVm;
use sk_runtimes::AnyRuntime;
use tracing::warn;

use super::{connection, NetDriver, Shared};

pub(super) fn start(driver: &mut NetDriver, name: &RuntimeName, config: &RuntimeConfig) -> Result<(), String> {
    let fd = connection::bind_listener(config.port).map_err(|e| e.to_string())?;

    let cache_config = CacheConfig {
        mode: CacheMode::ReadWrite,
        eviction: EvictionPolicy::NoEviction,
        max_memory: None,
        snapshot_path: None,
        replicate_target: None,
        force_resp2: false,
    };
    let runtime = CacheRuntime::new(cache_config, NullVm);
    driver
        .shared
        .registry
        .install_handle(name.as_str(), AnyRuntime::Cache(runtime), super::now_ms())
        .map_err(|e| e.to_string())?;
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
            // SAFETY: fd just accepted by this completion, not yet used elsewhere.
            unsafe { libc::fcntl(conn_fd, libc::F_SETFL, libc::O_NONBLOCK) };
            let _ = self.shared.registry.with_handle_mut(self.name.as_str(), |any| {
                if let Some(cache) = any.as_cache_mut() {
                    cache.on_connect();
                }
            });
            self.shared.track_connection(&self.name, conn_fd);
            arm_read(reactor, self.shared.clone(), self.name.clone(), conn_fd);
        } else if result != -libc::ECANCELED {
            warn!(runtime = self.name.as_str(), result, "accept completion failed");
        }

        if !io_uring::cqueue::more(flags) && result != -libc::ECANCELED {
            let next = AcceptCompletion { shared: self.shared.clone(), name: self.name.clone(), listen_fd: self.listen_fd };
            if let Err(e) = reactor.submit_accept(self.listen_fd, Box::new(next)) {
                warn!(runtime = self.name.as_str(), "failed to re-arm accept: {e}");
            }
        }
    }
}

fn arm_read(reactor: &mut Reactor, shared: Arc<Shared>, name: RuntimeName, fd: RawFd) {
    let mut buf = vec![0u8; connection::BUF_GROUP_LEN].into_boxed_slice();
    let entry_buf: *mut [u8] = &mut *buf;
    // SAFETY: see server_driver::arm_read — `buf` outlives the SQE inside `ReadCompletion`.
    let slice = unsafe { &mut *entry_buf };
    let completion = ReadCompletion { shared, name, fd, buf };
    if let Err(e) = reactor.submit_read(fd, slice, Box::new(completion)) {
        warn!("failed to submit cache read: {e}");
    }
}

struct ReadCompletion {
    shared: Arc<Shared>,
    name: RuntimeName,
    fd: RawFd,
    #[allow(dead_code)]
    buf: Box<[u8]>,
}

impl Completion for ReadCompletion {
    fn on_completion(self: Box<Self>, reactor: &mut Reactor, result: i32, _flags: u32) {
        if result <= 0 {
            disconnect(reactor, &self.shared, &self.name, self.fd);
            return;
        }
        let n = result as usize;
        let now = super::now_ms();
        let fed = self.shared.registry.with_handle_mut(self.name.as_str(), |any| {
            any.as_cache_mut().map(|c| c.feed(&self.buf[..n], now))
        });
        if let Ok(Some((replies, _consumed))) = fed {
            for reply in replies {
                write_back(reactor, self.fd, reply);
            }
        }
        arm_read(reactor, self.shared.clone(), self.name.clone(), self.fd);
    }
}

fn write_back(reactor: &mut Reactor, fd: RawFd, bytes: Vec<u8>) {
    let completion = WriteCompletion { fd, buf: bytes };
    let slice_ptr: *const [u8] = &*completion.buf;
    // SAFETY: `completion.buf` is moved with the completion and kept
    // alive until the write finishes.
    let slice = unsafe { &*slice_ptr };
    if let Err(e) = reactor.submit_write(fd, slice, Box::new(completion)) {
        warn!("failed to submit cache write: {e}");
    }
}

struct WriteCompletion {
    fd: RawFd,
    buf: Vec<u8>,
}

impl Completion for WriteCompletion {
    fn on_completion(self: Box<Self>, _reactor: &mut Reactor, result: i32, _flags: u32) {
        if result < 0 {
            warn!(fd = self.fd, result, "cache write failed");
        }
    }
}

fn disconnect(reactor: &mut Reactor, shared: &Arc<Shared>, name: &RuntimeName, fd: RawFd) {
    let _ = shared.registry.with_handle_mut(name.as_str(), |any| {
        if let Some(cache) = any.as_cache_mut() {
            cache.on_disconnect();
        }
    });
    shared.untrack_connection(name, fd);
    connection::cancel_then_close(reactor, fd);
}
