// SPDX-License-Identifier: MIT

//! Cold-start sequence: replay persisted runtime configs, re-start the
//! ones that were running when the daemon last stopped, then bind the
//! control socket(s) `main` drives.

use std::sync::Arc;

use sk_core::RuntimeName;
use sk_registry::Registry;
use sk_runtimes::AnyRuntime;
use tokio::net::UnixListener;
use tracing::{info, warn};

use super::{Config, LifecycleError};
use crate::net::NetDriverHandle;

pub struct StartupResult {
    pub control_listener: UnixListener,
    pub tcp_listener: Option<tokio::net::TcpListener>,
}

/// `registry` must be the same instance handed to [`crate::net::spawn`]
/// — completions on the reactor thread and this replay both mutate it
/// by name, so a mismatched pair would silently diverge.
pub async fn startup(
    config: &Config,
    registry: &Arc<Registry<AnyRuntime>>,
    net: &NetDriverHandle,
) -> Result<StartupResult, LifecycleError> {
    let now = crate::net::now_ms();

    let replayed = registry.replay(now)?;
    for name in &replayed {
        restart_if_was_running(registry, net, name).await;
    }

    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let control_listener = UnixListener::bind(&config.socket_path)?;
    info!(path = %config.socket_path.display(), "control socket listening");

    let tcp_listener = match crate::env::tcp_port() {
        Some(port) => {
            let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
            Some(tokio::net::TcpListener::bind(addr).await?)
        }
        None => None,
    };

    Ok(StartupResult { control_listener, tcp_listener })
}

async fn restart_if_was_running(registry: &Arc<Registry<AnyRuntime>>, net: &NetDriverHandle, name: &RuntimeName) {
    let Ok(config) = registry.config_for(name.as_str()) else { return };
    if !config.was_running {
        return;
    }
    if let Err(e) = net.start(name.clone(), config).await {
        warn!(runtime = name.as_str(), "failed to restart runtime on startup: {e}");
    }
}
