// SPDX-License-Identifier: MIT

//! The wiring layer between [`sk_reactor::Reactor`] and the byte-in/
//! byte-out runtime APIs in `sk_runtimes`: runtime setup submits
//! initial operations to the reactor, and completion callbacks drive
//! state-machine transitions from there. No runtime kind owns a real
//! fd; everything here does.
//!
//! The reactor runs on its own dedicated thread. Commands arrive over
//! a channel from the tokio control-socket listener; completions call
//! back into the shared [`sk_registry::Registry`] only for the
//! duration of one `feed`/`tick` call, never across a submission.

mod cache_driver;
mod client_driver;
mod connection;
mod proxy_driver;
mod server_driver;

use std::collections::HashMap;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use sk_core::{Clock, RuntimeName, SystemClock};
use sk_reactor::{AbsoluteTimespec, Reactor};
use sk_registry::{Registry, RuntimeConfig};
use sk_runtimes::AnyRuntime;
use tracing::{error, info, warn};

pub use connection::BUF_GROUP_LEN;

const TICK_GROUP: u16 = 1;

pub(crate) fn now_ms() -> u64 {
    SystemClock.epoch_ms()
}

/// A request the tokio side hands to the reactor thread. Replies go
/// back over a `tokio::sync::oneshot` channel so the listener's
/// command handler can await the outcome.
pub enum DriverCommand {
    Start { name: RuntimeName, config: RuntimeConfig, reply: tokio::sync::oneshot::Sender<Result<(), String>> },
    Stop { name: RuntimeName, reply: tokio::sync::oneshot::Sender<()> },
    Send { name: RuntimeName, message: Vec<u8>, reply: tokio::sync::oneshot::Sender<Result<(), String>> },
    Shutdown,
}

/// Handle the tokio side holds: a channel into the reactor thread plus
/// the join handle for graceful shutdown.
pub struct NetDriverHandle {
    tx: tokio::sync::mpsc::UnboundedSender<DriverCommand>,
    join: Option<JoinHandle<()>>,
}

impl NetDriverHandle {
    pub async fn start(&self, name: RuntimeName, config: RuntimeConfig) -> Result<(), String> {
        let (reply, rx) = tokio::sync::oneshot::channel();
        self.tx.send(DriverCommand::Start { name, config, reply }).map_err(|_| "reactor thread gone".to_string())?;
        rx.await.map_err(|_| "reactor thread dropped reply".to_string())?
    }

    pub async fn stop(&self, name: RuntimeName) {
        let (reply, rx) = tokio::sync::oneshot::channel();
        if self.tx.send(DriverCommand::Stop { name, reply }).is_ok() {
            let _ = rx.await;
        }
    }

    pub async fn send(&self, name: RuntimeName, message: Vec<u8>) -> Result<(), String> {
        let (reply, rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(DriverCommand::Send { name, message, reply })
            .map_err(|_| "reactor thread gone".to_string())?;
        rx.await.map_err(|_| "reactor thread dropped reply".to_string())?
    }

    pub fn shutdown(mut self) {
        let _ = self.tx.send(DriverCommand::Shutdown);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// A live listening or connecting fd this daemon owns for one runtime,
/// tracked so `Stop` can cancel-then-close every fd it owns — no fd
/// may outlive the connection it belongs to.
#[derive(Default)]
struct RuntimeNet {
    listen_fd: Option<RawFd>,
    connection_fds: Vec<RawFd>,
}

/// State reachable from inside a `Completion::on_completion`, which
/// only receives `&mut Reactor` — everything a completion handler
/// needs beyond the ring itself lives here, behind an `Arc` every
/// handler clones a copy of.
pub(crate) struct Shared {
    registry: Arc<Registry<AnyRuntime>>,
    runtimes: Mutex<HashMap<RuntimeName, RuntimeNet>>,
    next_connection_id: AtomicU64,
}

impl Shared {
    fn alloc_connection_id(&self) -> u64 {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }

    fn track_listener(&self, name: &RuntimeName, fd: RawFd) {
        self.runtimes.lock().entry(name.clone()).or_default().listen_fd = Some(fd);
    }

    fn track_connection(&self, name: &RuntimeName, fd: RawFd) {
        self.runtimes.lock().entry(name.clone()).or_default().connection_fds.push(fd);
    }

    fn untrack_connection(&self, name: &RuntimeName, fd: RawFd) {
        if let Some(net) = self.runtimes.lock().get_mut(name) {
            net.connection_fds.retain(|&existing| existing != fd);
        }
    }
}

/// Owns the `io_uring` ring; lives entirely on the reactor thread.
struct NetDriver {
    reactor: Reactor,
    shared: Arc<Shared>,
    rx: tokio::sync::mpsc::UnboundedReceiver<DriverCommand>,
}

/// Spawn the reactor on its own OS thread and return a handle the
/// tokio runtime uses to drive it.
pub fn spawn(registry: Arc<Registry<AnyRuntime>>, queue_depth: Option<u32>) -> std::io::Result<NetDriverHandle> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let join = std::thread::Builder::new().name("sk-reactor".into()).spawn(move || {
        let reactor = match Reactor::init(queue_depth) {
            Ok(r) => r,
            Err(e) => {
                error!("reactor init failed: {e}");
                return;
            }
        };
        let shared =
            Arc::new(Shared { registry, runtimes: Mutex::new(HashMap::new()), next_connection_id: AtomicU64::new(1) });
        let mut driver = NetDriver { reactor, shared, rx };
        driver.reactor.register_buffer_group(TICK_GROUP, 256, BUF_GROUP_LEN);
        driver.run();
    })?;
    Ok(NetDriverHandle { tx, join: Some(join) })
}

impl NetDriver {
    /// Cooperative loop: drain queued commands without blocking, run
    /// one reactor submit-and-wait pass, repeat. `run()` on the
    /// reactor itself blocks until `request_stop`, so this driver
    /// calls the lower-level pieces directly instead of `Reactor::run`.
    fn run(&mut self) {
        loop {
            while let Ok(cmd) = self.rx.try_recv() {
                if matches!(cmd, DriverCommand::Shutdown) {
                    self.teardown_all();
                    return;
                }
                self.handle_command(cmd);
            }
            if let Err(e) =
                self.reactor.submit_timeout(AbsoluteTimespec { secs: 0, nanos: 50_000_000 }, Box::new(TickSentinel))
            {
                warn!("failed to arm driver tick: {e}");
            }
            if let Err(e) = self.reactor.tick() {
                error!("reactor pump failed: {e}");
            }
        }
    }

    fn handle_command(&mut self, cmd: DriverCommand) {
        match cmd {
            DriverCommand::Start { name, config, reply } => {
                let result = self.start_runtime(&name, &config);
                let _ = reply.send(result);
            }
            DriverCommand::Stop { name, reply } => {
                self.stop_runtime(&name);
                let _ = reply.send(());
            }
            DriverCommand::Send { name, message, reply } => {
                let result = self.send_to(&name, &message);
                let _ = reply.send(result);
            }
            DriverCommand::Shutdown => unreachable!("handled in run()"),
        }
    }

    fn start_runtime(&mut self, name: &RuntimeName, config: &RuntimeConfig) -> Result<(), String> {
        match config.kind {
            sk_core::RuntimeKind::Server => server_driver::start(self, name, config),
            sk_core::RuntimeKind::Cache => cache_driver::start(self, name, config),
            sk_core::RuntimeKind::Client => client_driver::start(self, name, config),
            sk_core::RuntimeKind::Proxy => proxy_driver::start(self, name, config),
        }
    }

    fn stop_runtime(&mut self, name: &RuntimeName) {
        self.close_tracked_fds(name);
        if let Ok((handle, children)) = self.shared.registry.stop(name.as_str()) {
            drop(handle);
            for child in &children {
                self.close_tracked_fds(child);
            }
        }
        info!(runtime = name.as_str(), "runtime stopped");
    }

    /// Close every reactor-owned fd this daemon tracks for `name`
    /// (its listening socket plus any accepted connections). Used both
    /// for a direct stop and for each child `Registry::stop` cascades
    /// into, since the registry itself has no idea these fds exist.
    fn close_tracked_fds(&mut self, name: &RuntimeName) {
        if let Some(net) = self.shared.runtimes.lock().remove(name) {
            if let Some(fd) = net.listen_fd {
                connection::cancel_then_close(&mut self.reactor, fd);
            }
            for fd in net.connection_fds {
                connection::cancel_then_close(&mut self.reactor, fd);
            }
        }
    }

    fn send_to(&mut self, name: &RuntimeName, message: &[u8]) -> Result<(), String> {
        // `send <name> <message>` delivers to a client's outbound
        // write queue or broadcasts through a server/cache's
        // extension VM; client is the common case wired here.
        self.shared
            .registry
            .with_handle_mut(name.as_str(), |any| {
                if let Some(client) = any.as_client_mut() {
                    client.send(message.to_vec());
                }
            })
            .map_err(|e| e.to_string())
    }

    fn teardown_all(&mut self) {
        let drained: Vec<(RuntimeName, RuntimeNet)> = self.shared.runtimes.lock().drain().collect();
        for (name, net) in drained {
            if let Some(fd) = net.listen_fd {
                connection::cancel_then_close(&mut self.reactor, fd);
            }
            for fd in net.connection_fds {
                connection::cancel_then_close(&mut self.reactor, fd);
            }
            let _ = self.shared.registry.stop(name.as_str());
        }
    }
}

struct TickSentinel;

impl sk_reactor::Completion for TickSentinel {
    fn on_completion(self: Box<Self>, _reactor: &mut Reactor, _result: i32, _flags: u32) {
        // Timer fires purely to keep the loop cycling through queued
        // `DriverCommand`s; per-runtime `tick()` calls are driven from
        // `server_driver`/`cache_driver` against the live connection set.
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
