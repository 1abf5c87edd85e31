// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("rustls error: {0}")]
    Protocol(#[from] rustls::Error),

    #[error("failed to load certificate/key material: {0}")]
    Material(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum WsError {
    #[error("not a websocket upgrade request")]
    NotAnUpgrade,

    #[error("malformed handshake request: {0}")]
    BadHandshake(String),

    #[error("fragmented frames are not supported")]
    FragmentedFrame,

    #[error("control frame payload exceeds 125 bytes ({0})")]
    ControlPayloadTooLarge(usize),

    #[error("frame payload exceeds the 16 MiB cap ({0} bytes)")]
    PayloadTooLarge(usize),

    #[error("reserved opcode {0:#x}")]
    ReservedOpcode(u8),
}

#[derive(Debug, Error)]
pub enum CacheProtoError {
    #[error("malformed RESP2 frame: {0}")]
    BadResp2(String),

    #[error("malformed inline command: {0}")]
    BadInline(String),
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("malformed request: {0}")]
    BadRequest(String),
}
