// SPDX-License-Identifier: MIT

//! Control-socket responses: every response carries an exit code
//! (0 success, 1 bad input, 2 fatal) plus a UTF-8 body.

use crate::types::{RuntimeDetail, RuntimeSummary};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    BadInput = 1,
    Fatal = 2,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Response {
    Ok,
    Text { body: String },
    Runtimes { runtimes: Vec<RuntimeSummary> },
    Detail { runtime: RuntimeDetail },
    Error { message: String },
    Fatal { message: String },
}

impl Response {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Response::Error { .. } => ExitCode::BadInput,
            Response::Fatal { .. } => ExitCode::Fatal,
            _ => ExitCode::Success,
        }
    }

    /// Render the UTF-8 body placed between the exit-code byte and the
    /// trailing NUL.
    pub fn body(&self) -> String {
        match self {
            Response::Ok => String::new(),
            Response::Text { body } => body.clone(),
            Response::Runtimes { runtimes } => runtimes
                .iter()
                .map(|r| {
                    format!(
                        "{}\t{}\t{}\t{}\t{}",
                        r.id,
                        r.name,
                        r.kind,
                        r.state,
                        r.group.as_deref().unwrap_or("-")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Response::Detail { runtime } => serde_json::to_string_pretty(runtime)
                .unwrap_or_else(|e| format!("<undisplayable detail: {e}>")),
            Response::Error { message } => message.clone(),
            Response::Fatal { message } => message.clone(),
        }
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
