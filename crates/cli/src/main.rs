// SPDX-License-Identifier: MIT

//! `socketley`: thin control-socket client for the `socketleyd` daemon.
//! Parses arguments, builds one command line, sends it over the
//! control socket, and prints the daemon's response.

mod client;
mod commands;
mod daemon_process;
mod env;
mod exit_error;

use clap::{Parser, Subcommand};

use commands::{control, daemon};

#[derive(Parser)]
#[command(name = "socketley", version, about = "Control client for the socketleyd daemon")]
struct Cli {
    #[command(subcommand)]
    command: TopCommand,
}

#[derive(Subcommand)]
enum TopCommand {
    #[command(flatten)]
    Control(control::Commands),
    /// Manage the socketleyd process itself
    Daemon {
        #[command(subcommand)]
        command: daemon::DaemonCommand,
    },
}

fn main() {
    let cli = Cli::parse();
    let code = match cli.command {
        TopCommand::Control(cmd) => control::dispatch(cmd),
        TopCommand::Daemon { command } => daemon::dispatch(command),
    };
    std::process::exit(code);
}
