// SPDX-License-Identifier: MIT

//! sk-net: the wire-level envelope and codec layer between the
//! reactor's raw completion buffers and each runtime's protocol logic
//! — TLS, WebSocket, static HTTP, and the cache runtime's two text
//! protocols.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod cache_proto;
pub mod error;
pub mod http;
pub mod tls;
pub mod ws;

pub use error::{CacheProtoError, HttpError, TlsError, WsError};
