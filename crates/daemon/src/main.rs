// SPDX-License-Identifier: MIT

//! `socketleyd`: the Socketley daemon process. Owns the reactor
//! thread, the runtime registry, the control socket, and the optional
//! cluster publisher.

mod env;
mod lifecycle;
mod listener;
mod net;

use std::sync::Arc;

use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    match run().await {
        Ok(()) => std::process::ExitCode::from(0),
        Err(e) => {
            tracing::error!("{e}");
            std::process::ExitCode::from(2)
        }
    }
}

/// Logs to stdout and to a daily-rolling file under `<state_dir>/logs`.
/// The returned guard must stay alive for the process lifetime —
/// dropping it stops the background flush of the non-blocking file
/// writer.
fn init_tracing(state_dir: &std::path::Path) -> tracing_appender::non_blocking::WorkerGuard {
    let log_dir = state_dir.join("logs");
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "socketleyd.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_env("SOCKETLEY_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stdout.and(file_writer))
        .init();
    guard
}

async fn run() -> anyhow::Result<()> {
    let config = lifecycle::Config::load()?;
    let _tracing_guard = init_tracing(&config.state_dir);
    let _lock = lifecycle::acquire_lock(&config.lock_path)?;
    tracing::info!(state_dir = %config.state_dir.display(), "socketleyd starting");

    let registry = Arc::new(sk_registry::Registry::new(config.state_dir.clone()));
    let net = Arc::new(net::spawn(registry.clone(), config.queue_depth)?);

    let startup = lifecycle::startup(&config, &registry, &net).await?;

    let cluster_task = spawn_cluster_publisher(&config, registry.clone());

    let ctx = Arc::new(listener::commands::Context { registry: registry.clone(), net: net.clone() });

    let unix_task = tokio::spawn(listener::serve_unix(startup.control_listener, ctx.clone()));
    let tcp_task = startup.tcp_listener.map(|listener| tokio::spawn(listener::serve_tcp(listener, ctx.clone())));

    wait_for_shutdown_signal().await?;
    tracing::info!("shutdown signal received, draining runtimes");

    unix_task.abort();
    if let Some(task) = tcp_task {
        task.abort();
    }
    if let Some(task) = cluster_task {
        task.abort();
    }

    for mut handle in registry.stop_all() {
        sk_registry::RuntimeHandle::teardown(&mut handle);
    }
    match Arc::try_unwrap(net) {
        Ok(handle) => handle.shutdown(),
        Err(_) => tracing::warn!("reactor handle still referenced at shutdown; skipping join"),
    }

    Ok(())
}

fn spawn_cluster_publisher(
    config: &lifecycle::Config,
    registry: Arc<sk_registry::Registry<sk_runtimes::AnyRuntime>>,
) -> Option<tokio::task::JoinHandle<()>> {
    let cluster_dir = config.cluster_dir.clone()?;
    let daemon_name = format!("socketleyd-{}", std::process::id());
    let host = hostname();
    Some(tokio::spawn(async move {
        let now = || std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
        let mut publisher = match sk_cluster::ClusterPublisher::claim(daemon_name, host, cluster_dir, now()) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("cluster publisher failed to start: {e}");
                return;
            }
        };
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(2));
        loop {
            interval.tick().await;
            let runtimes = registry
                .list()
                .into_iter()
                .map(|v| sk_cluster::RuntimeSnapshot {
                    name: v.name.as_str().to_string(),
                    kind: v.config.kind.to_string(),
                    group: v.config.group.clone(),
                    port: v.config.port,
                    state: v.state.to_string(),
                    connections: v.connections as u64,
                })
                .collect();
            match publisher.tick(now(), runtimes) {
                Ok(events) => {
                    for event in events {
                        tracing::info!(?event, "cluster event");
                    }
                }
                Err(e) => tracing::warn!("cluster publisher tick failed: {e}"),
            }
        }
    }))
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = term.recv() => {}
        _ = int.recv() => {}
    }
    Ok(())
}
