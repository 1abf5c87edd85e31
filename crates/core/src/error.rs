// SPDX-License-Identifier: MIT

//! Shared error taxonomy: errors that cross crate boundaries carry
//! enough context to decide locally whether they are fatal to the
//! daemon, fatal to one runtime, or local to one connection/callback.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid runtime id: {0}")]
    InvalidId(String),

    #[error("invalid runtime name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },
}
