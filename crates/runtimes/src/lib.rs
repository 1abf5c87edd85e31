// SPDX-License-Identifier: MIT

//! Concrete runtime kinds behind `sk_registry::RuntimeHandle` (spec
//! §4.3–§4.6): server, client, proxy, and cache. Each owns no fd or
//! reactor resource directly — a runtime only ever sees bytes in and
//! bytes out; the reactor/daemon wiring layer owns the actual sockets.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod any;
pub mod base;
pub mod cache;
pub mod client;
pub mod error;
pub mod extension;
pub mod proxy;
pub mod server;

pub use any::AnyRuntime;
pub use error::{Result, RuntimeError};
pub use extension::{AuthDecision, ConnCtx, ExtensionVm, NullVm};
