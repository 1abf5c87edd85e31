// SPDX-License-Identifier: MIT

//! Control-socket request types: one variant per accepted command.
//! The wire representation is a single `\n`-terminated line;
//! [`crate::codec::parse_line`] tokenizes and maps it onto these.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd", rename_all = "kebab-case")]
pub enum Request {
    Create {
        kind: String,
        name: String,
        port: Option<u16>,
        #[serde(default)]
        udp: bool,
        #[serde(default)]
        backend: Vec<String>,
        #[serde(default)]
        strategy: Option<String>,
        #[serde(default)]
        protocol: Option<String>,
        #[serde(default)]
        script: Option<String>,
        #[serde(default)]
        group: Option<String>,
        #[serde(default)]
        owner: Option<String>,
    },
    Start {
        name: String,
        /// `-i`: switch this connection into an interactive session.
        #[serde(default)]
        interactive: bool,
    },
    Stop {
        name: String,
    },
    Remove {
        name: String,
    },
    Ls,
    Ps,
    Stats {
        name: Option<String>,
    },
    Show {
        name: String,
    },
    Owner {
        name: String,
        owner: Option<String>,
    },
    Send {
        name: String,
        message: String,
    },
    Edit {
        name: String,
        field: String,
        value: String,
    },
    Dump {
        name: Option<String>,
    },
    Import {
        path: String,
    },
    ReloadLua {
        name: String,
    },
    Reload {
        name: String,
    },
    Attach {
        name: String,
    },
    ClusterDir {
        path: Option<String>,
    },
    Action {
        name: String,
        verb: String,
        args: Vec<String>,
    },
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
