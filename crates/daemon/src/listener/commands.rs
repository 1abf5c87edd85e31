// SPDX-License-Identifier: MIT

//! Maps a [`sk_wire::Request`] onto `Registry<AnyRuntime>` and
//! [`NetDriverHandle`] calls, and a [`sk_wire::Response`] back. One
//! function per command, dispatched from [`super::serve`].

use std::str::FromStr;
use std::sync::Arc;

use sk_core::{RuntimeKind, RuntimeName};
use sk_registry::{Registry, RuntimeConfig, RuntimeView};
use sk_runtimes::AnyRuntime;
use sk_wire::{Request, Response, RuntimeDetail, RuntimeSummary};

use crate::net::NetDriverHandle;

pub struct Context {
    pub registry: Arc<Registry<AnyRuntime>>,
    pub net: Arc<NetDriverHandle>,
}

pub async fn handle(ctx: &Context, request: Request) -> Response {
    match request {
        Request::Create { kind, name, port, udp, backend, strategy, protocol, script, group, owner } => {
            create(ctx, kind, name, port, udp, backend, strategy, protocol, script, group, owner)
        }
        Request::Start { name, interactive: _ } => start(ctx, name).await,
        Request::Stop { name } => stop(ctx, name).await,
        Request::Remove { name } => remove(ctx, name),
        Request::Ls => Response::Runtimes { runtimes: ctx.registry.list().iter().map(summarize).collect() },
        Request::Ps => {
            let running: Vec<RuntimeSummary> = ctx
                .registry
                .list()
                .iter()
                .filter(|v| v.state == sk_core::LifecycleState::Running)
                .map(summarize)
                .collect();
            Response::Runtimes { runtimes: running }
        }
        Request::Stats { name } => stats(ctx, name),
        Request::Show { name } => show(ctx, name),
        Request::Owner { name, owner } => match owner {
            Some(owner) => set_owner(ctx, name, Some(owner)),
            None => get_owner(ctx, name),
        },
        Request::Send { name, message } => send(ctx, name, message).await,
        Request::Edit { name, field, value } => edit(ctx, name, field, value),
        Request::Dump { name } => dump(ctx, name),
        Request::Import { path } => import(ctx, path),
        Request::ReloadLua { name } => {
            let _ = name;
            Response::Error { message: "script reloading is not supported without a Lua extension VM".into() }
        }
        Request::Reload { name } => reload(ctx, name).await,
        Request::Attach { name } => {
            let _ = name;
            Response::Error { message: "attach requires a persistent session; use the CLI's interactive mode".into() }
        }
        Request::ClusterDir { path } => {
            let _ = path;
            Response::Error { message: "cluster directory is fixed at startup via SOCKETLEY_CLUSTER_DIR".into() }
        }
        Request::Action { name, verb, args } => action(ctx, name, verb, args).await,
    }
}

#[allow(clippy::too_many_arguments)]
fn create(
    ctx: &Context,
    kind: String,
    name: String,
    port: Option<u16>,
    udp: bool,
    backend: Vec<String>,
    strategy: Option<String>,
    protocol: Option<String>,
    script: Option<String>,
    group: Option<String>,
    owner: Option<String>,
) -> Response {
    let Ok(kind) = RuntimeKind::from_str(&kind) else {
        return Response::Error { message: format!("unknown runtime kind {kind:?}") };
    };
    let Ok(name) = RuntimeName::parse(&name) else {
        return Response::Error { message: format!("invalid runtime name {name:?}") };
    };
    let (backends, upstreams) = match kind {
        RuntimeKind::Proxy => (backend, Vec::new()),
        RuntimeKind::Client => (Vec::new(), backend),
        _ => (Vec::new(), Vec::new()),
    };
    let config = RuntimeConfig {
        kind,
        port: port.unwrap_or(0),
        udp,
        tls_cert_path: None,
        tls_key_path: None,
        script_path: script,
        owner,
        child_policy: sk_core::ChildPolicy::default(),
        group,
        backends,
        strategy,
        protocol,
        upstreams,
        mesh_tls: false,
        externally_managed: false,
        fsync_every_write: true,
        was_running: false,
    };
    match ctx.registry.create(name, config, crate::net::now_ms()) {
        Ok(id) => Response::Text { body: id.to_string() },
        Err(e) => Response::Error { message: e.to_string() },
    }
}

async fn start(ctx: &Context, name: String) -> Response {
    let Ok(runtime_name) = RuntimeName::parse(&name) else {
        return Response::Error { message: format!("invalid runtime name {name:?}") };
    };
    let config = match ctx.registry.config_for(&name) {
        Ok(c) => c,
        Err(e) => return Response::Error { message: e.to_string() },
    };
    match ctx.net.start(runtime_name, config).await {
        Ok(()) => Response::Ok,
        Err(e) => Response::Error { message: e },
    }
}

async fn stop(ctx: &Context, name: String) -> Response {
    let Ok(runtime_name) = RuntimeName::parse(&name) else {
        return Response::Error { message: format!("invalid runtime name {name:?}") };
    };
    ctx.net.stop(runtime_name).await;
    Response::Ok
}

fn remove(ctx: &Context, name: String) -> Response {
    match ctx.registry.remove(&name) {
        Ok(Some(mut handle)) => {
            sk_registry::RuntimeHandle::teardown(&mut handle);
            Response::Ok
        }
        Ok(None) => Response::Ok,
        Err(e) => Response::Error { message: e.to_string() },
    }
}

fn stats(ctx: &Context, name: Option<String>) -> Response {
    match name {
        Some(name) => match ctx.registry.get(&name) {
            Ok(view) => Response::Text { body: serde_json::to_string_pretty(&view.config).unwrap_or_default() },
            Err(e) => Response::Error { message: e.to_string() },
        },
        None => Response::Runtimes { runtimes: ctx.registry.list().iter().map(summarize).collect() },
    }
}

fn show(ctx: &Context, name: String) -> Response {
    match ctx.registry.get(&name) {
        Ok(view) => {
            let stats = ctx
                .registry
                .with_handle_mut(&name, |h| sk_registry::RuntimeHandle::stats(h))
                .unwrap_or_default();
            Response::Detail { runtime: detail(&view, stats) }
        }
        Err(e) => Response::Error { message: e.to_string() },
    }
}

fn set_owner(ctx: &Context, name: String, owner: Option<String>) -> Response {
    edit(ctx, name, "owner".to_string(), owner.unwrap_or_default())
}

fn get_owner(ctx: &Context, name: String) -> Response {
    match ctx.registry.get(&name) {
        Ok(view) => Response::Text { body: view.config.owner.unwrap_or_else(|| "-".to_string()) },
        Err(e) => Response::Error { message: e.to_string() },
    }
}

async fn send(ctx: &Context, name: String, message: String) -> Response {
    let Ok(runtime_name) = RuntimeName::parse(&name) else {
        return Response::Error { message: format!("invalid runtime name {name:?}") };
    };
    match ctx.net.send(runtime_name, message.into_bytes()).await {
        Ok(()) => Response::Ok,
        Err(e) => Response::Error { message: e },
    }
}

/// Limited field set: the ones that can change without a restart.
/// `edit` covers persisted config only — a running socket's bound
/// port can't change without a stop/start.
fn edit(ctx: &Context, name: String, field: String, value: String) -> Response {
    let Ok(mut config) = ctx.registry.config_for(&name) else {
        return Response::Error { message: format!("no runtime named {name:?}") };
    };
    match field.as_str() {
        "owner" => config.owner = if value.is_empty() { None } else { Some(value) },
        "group" => config.group = if value.is_empty() { None } else { Some(value) },
        "strategy" => config.strategy = Some(value),
        "protocol" => config.protocol = Some(value),
        "script" => config.script_path = Some(value),
        other => return Response::Error { message: format!("unknown field {other:?}") },
    }
    match ctx.registry.update_config(&name, config) {
        Ok(()) => Response::Ok,
        Err(e) => Response::Error { message: e.to_string() },
    }
}

fn dump(ctx: &Context, name: Option<String>) -> Response {
    let views: Vec<RuntimeView> = match name {
        Some(name) => match ctx.registry.get(&name) {
            Ok(v) => vec![v],
            Err(e) => return Response::Error { message: e.to_string() },
        },
        None => ctx.registry.list(),
    };
    let configs: Vec<&RuntimeConfig> = views.iter().map(|v| &v.config).collect();
    Response::Text { body: serde_json::to_string_pretty(&configs).unwrap_or_default() }
}

fn import(ctx: &Context, path: String) -> Response {
    let Ok(text) = std::fs::read_to_string(&path) else {
        return Response::Error { message: format!("cannot read {path:?}") };
    };
    let configs: Vec<RuntimeConfig> = match serde_json::from_str(&text) {
        Ok(c) => c,
        Err(e) => return Response::Error { message: format!("malformed import file: {e}") },
    };
    let mut imported = 0;
    for config in configs {
        let name = format!("imported-{}", imported);
        let Ok(name) = RuntimeName::parse(&name) else { continue };
        if ctx.registry.create(name, config, crate::net::now_ms()).is_ok() {
            imported += 1;
        }
    }
    Response::Text { body: format!("imported {imported} runtime(s)") }
}

async fn reload(ctx: &Context, name: String) -> Response {
    let config = match ctx.registry.config_for(&name) {
        Ok(c) => c,
        Err(e) => return Response::Error { message: e.to_string() },
    };
    let Ok(runtime_name) = RuntimeName::parse(&name) else {
        return Response::Error { message: format!("invalid runtime name {name:?}") };
    };
    ctx.net.stop(runtime_name.clone()).await;
    match ctx.net.start(runtime_name, config).await {
        Ok(()) => Response::Ok,
        Err(e) => Response::Error { message: e },
    }
}

async fn action(ctx: &Context, name: String, verb: String, args: Vec<String>) -> Response {
    match verb.as_str() {
        "publish" => {
            let channel = args.first().cloned().unwrap_or_default();
            let message = args.get(1).cloned().unwrap_or_default();
            let delivered = ctx.registry.publish(&channel, message.as_bytes());
            Response::Text { body: delivered.to_string() }
        }
        "send" => send(ctx, name, args.join(" ")).await,
        other => Response::Error { message: format!("unknown action verb {other:?} for {name:?}") },
    }
}

fn summarize(view: &RuntimeView) -> RuntimeSummary {
    RuntimeSummary {
        id: view.id,
        name: view.name.as_str().to_string(),
        kind: view.config.kind,
        state: view.state,
        port: view.config.port,
        group: view.config.group.clone(),
        connections: view.connections as u64,
    }
}

fn detail(view: &RuntimeView, stats: sk_core::RuntimeStatsSnapshot) -> RuntimeDetail {
    RuntimeDetail {
        id: view.id,
        name: view.name.as_str().to_string(),
        kind: view.config.kind,
        state: view.state,
        port: view.config.port,
        udp: view.config.udp,
        tls: view.config.tls_cert_path.is_some(),
        script_path: view.config.script_path.clone(),
        owner: view.config.owner.clone(),
        child_policy: view.config.child_policy,
        group: view.config.group.clone(),
        created_at_epoch_ms: view.created_at_epoch_ms,
        started_at_epoch_ms: view.started_at_epoch_ms,
        stats,
    }
}

