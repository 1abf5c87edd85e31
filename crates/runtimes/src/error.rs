// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("listen setup failed: {0}")]
    ListenFailed(String),

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("script callback {callback:?} failed: {message}")]
    Script { callback: &'static str, message: String },

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error(transparent)]
    Net(#[from] sk_net::error::WsError),

    #[error(transparent)]
    CacheProto(#[from] sk_net::error::CacheProtoError),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
