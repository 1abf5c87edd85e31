// SPDX-License-Identifier: MIT

//! Runtime-management subcommands: each builds the exact line
//! `sk_wire::codec::parse_line` expects, sends it, and maps the
//! daemon's `[exit_code] body` response onto stdout/stderr and the
//! process exit code.

use clap::Subcommand;

use crate::client::DaemonClient;
use crate::exit_error::ExitError;

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new runtime
    Create {
        /// server | client | proxy | cache
        kind: String,
        name: String,
        #[arg(short = 'p', long)]
        port: Option<u16>,
        #[arg(long)]
        udp: bool,
        /// comma-separated backend/upstream addresses
        #[arg(long, value_delimiter = ',')]
        backend: Vec<String>,
        #[arg(long)]
        strategy: Option<String>,
        #[arg(long)]
        protocol: Option<String>,
        #[arg(long)]
        script: Option<String>,
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        owner: Option<String>,
    },
    /// Start a runtime
    Start {
        name: String,
        #[arg(short = 'i', long)]
        interactive: bool,
    },
    /// Stop a runtime
    Stop { name: String },
    /// Remove a runtime's persisted config
    Remove { name: String },
    /// List every runtime
    Ls,
    /// List running runtimes
    Ps,
    /// Show stats, or one runtime's
    Stats { name: Option<String> },
    /// Show one runtime's full detail
    Show { name: String },
    /// Get or set a runtime's owner
    Owner { name: String, owner: Option<String> },
    /// Send a message to a runtime (e.g. a client's outbound queue)
    Send { name: String, message: Vec<String> },
    /// Edit a persisted config field
    Edit { name: String, field: String, value: Vec<String> },
    /// Dump persisted config as JSON
    Dump { name: Option<String> },
    /// Bulk-create runtimes from a JSON file of configs
    Import { path: String },
    /// Hot-reload a runtime's script
    ReloadLua { name: String },
    /// Stop then start a runtime
    Reload { name: String },
    /// Attach to a runtime's interactive output
    Attach { name: String },
    /// Inspect or change the cluster directory
    ClusterDir { path: Option<String> },
    /// Runtime-specific action verb (e.g. `action ch1 publish hello`)
    Action { name: String, verb: String, args: Vec<String> },
}

pub fn dispatch(cmd: Commands) -> i32 {
    let line = to_line(&cmd);
    let mut client = match DaemonClient::connect_or_start() {
        Ok(c) => c,
        Err(e) => return report_error(&e),
    };
    run(&mut client, &line)
}

fn to_line(cmd: &Commands) -> String {
    match cmd {
        Commands::Create { kind, name, port, udp, backend, strategy, protocol, script, group, owner } => {
            let mut parts = vec!["create".to_string(), kind.clone(), quote(name)];
            if let Some(p) = port {
                parts.push("-p".into());
                parts.push(p.to_string());
            }
            if *udp {
                parts.push("--udp".into());
            }
            if !backend.is_empty() {
                parts.push("--backend".into());
                parts.push(backend.join(","));
            }
            push_opt(&mut parts, "--strategy", strategy);
            push_opt(&mut parts, "--protocol", protocol);
            push_opt(&mut parts, "--script", script);
            push_opt(&mut parts, "--group", group);
            push_opt(&mut parts, "--owner", owner);
            parts.join(" ")
        }
        Commands::Start { name, interactive } => {
            let mut line = format!("start {}", quote(name));
            if *interactive {
                line.push_str(" -i");
            }
            line
        }
        Commands::Stop { name } => format!("stop {}", quote(name)),
        Commands::Remove { name } => format!("remove {}", quote(name)),
        Commands::Ls => "ls".to_string(),
        Commands::Ps => "ps".to_string(),
        Commands::Stats { name } => with_opt_name("stats", name),
        Commands::Show { name } => format!("show {}", quote(name)),
        Commands::Owner { name, owner } => match owner {
            Some(o) => format!("owner {} {}", quote(name), quote(o)),
            None => format!("owner {}", quote(name)),
        },
        Commands::Send { name, message } => format!("send {} {}", quote(name), message.join(" ")),
        Commands::Edit { name, field, value } => {
            format!("edit {} {} {}", quote(name), quote(field), value.join(" "))
        }
        Commands::Dump { name } => with_opt_name("dump", name),
        Commands::Import { path } => format!("import {}", quote(path)),
        Commands::ReloadLua { name } => format!("reload-lua {}", quote(name)),
        Commands::Reload { name } => format!("reload {}", quote(name)),
        Commands::Attach { name } => format!("attach {}", quote(name)),
        Commands::ClusterDir { path } => with_opt_name("cluster-dir", path),
        Commands::Action { name, verb, args } => {
            format!("action {} {} {}", quote(name), quote(verb), args.join(" "))
        }
    }
}

fn push_opt(parts: &mut Vec<String>, flag: &str, value: &Option<String>) {
    if let Some(v) = value {
        parts.push(flag.to_string());
        parts.push(quote(v));
    }
}

fn with_opt_name(cmd: &str, name: &Option<String>) -> String {
    match name {
        Some(n) => format!("{cmd} {}", quote(n)),
        None => cmd.to_string(),
    }
}

fn quote(token: &str) -> String {
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        format!("\"{token}\"")
    } else {
        token.to_string()
    }
}

fn run(client: &mut DaemonClient, line: &str) -> i32 {
    match client.send_line(line) {
        Ok((code, body)) => {
            if !body.is_empty() {
                if code == 0 {
                    println!("{body}");
                } else {
                    eprintln!("{body}");
                }
            }
            code as i32
        }
        Err(e) => report_error(&e),
    }
}

fn report_error(e: &ExitError) -> i32 {
    eprintln!("{e}");
    e.code
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
