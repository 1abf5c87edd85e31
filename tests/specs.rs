//! Workspace-level black-box specs: every test here drives the real
//! `socketley`/`socketleyd` binaries exactly as an operator would,
//! never the crates' internal APIs directly.

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/cache.rs"]
mod cache;
#[path = "specs/cli.rs"]
mod cli;
#[path = "specs/cluster.rs"]
mod cluster;
#[path = "specs/persistence.rs"]
mod persistence;
#[path = "specs/proxy.rs"]
mod proxy;
#[path = "specs/server.rs"]
mod server;
