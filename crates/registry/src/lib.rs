// SPDX-License-Identifier: MIT

//! Runtime lifecycle and config persistence for the Socketley daemon.
//! Owns the name→runtime map; knows nothing about how a runtime
//! actually drives sockets — that's `sk-runtimes`, reached only through
//! the [`RuntimeHandle`] seam.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod config;
mod error;
mod handle;
mod persistence;
mod registry;

pub use config::RuntimeConfig;
pub use error::{RegistryError, Result};
pub use handle::RuntimeHandle;
pub use registry::{Registry, RuntimeView};
