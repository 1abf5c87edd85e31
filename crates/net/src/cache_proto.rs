// SPDX-License-Identifier: MIT

//! The cache runtime's two wire protocols, auto-detected by first
//! byte: RESP2 (`*`-prefixed arrays of bulk strings) or inline
//! (whitespace-tokenized, `\n`-terminated).

use memchr::memchr;

use crate::error::CacheProtoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireMode {
    Resp2,
    Inline,
}

pub fn detect_mode(first_byte: u8) -> WireMode {
    if first_byte == b'*' {
        WireMode::Resp2
    } else {
        WireMode::Inline
    }
}

/// Parse one command (as a vector of argument byte-strings) from the
/// front of `buf`. Returns `Ok(None)` when `buf` doesn't yet hold a
/// complete command.
pub fn parse_command(buf: &[u8]) -> Result<Option<(Vec<Vec<u8>>, usize)>, CacheProtoError> {
    if buf.is_empty() {
        return Ok(None);
    }
    match detect_mode(buf[0]) {
        WireMode::Resp2 => parse_resp2(buf),
        WireMode::Inline => parse_inline(buf),
    }
}

fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
    memchr(b'\n', &buf[from..]).map(|i| from + i)
}

fn parse_line_int(buf: &[u8], from: usize) -> Result<Option<(i64, usize)>, CacheProtoError> {
    let Some(nl) = find_crlf(buf, from) else { return Ok(None) };
    let end = if nl > from && buf[nl - 1] == b'\r' { nl - 1 } else { nl };
    let text = std::str::from_utf8(&buf[from..end]).map_err(|_| CacheProtoError::BadResp2("non-utf8 length".into()))?;
    let n = text.parse::<i64>().map_err(|_| CacheProtoError::BadResp2(format!("bad integer: {text:?}")))?;
    Ok(Some((n, nl + 1)))
}

fn parse_resp2(buf: &[u8]) -> Result<Option<(Vec<Vec<u8>>, usize)>, CacheProtoError> {
    if buf[0] != b'*' {
        return Err(CacheProtoError::BadResp2("expected '*' array marker".into()));
    }
    let Some((count, mut pos)) = parse_line_int(buf, 1)? else { return Ok(None) };
    if count < 0 {
        return Err(CacheProtoError::BadResp2("negative array length".into()));
    }

    let mut args = Vec::with_capacity(count as usize);
    for _ in 0..count {
        if pos >= buf.len() || buf[pos] != b'$' {
            if pos >= buf.len() {
                return Ok(None);
            }
            return Err(CacheProtoError::BadResp2("expected '$' bulk-string marker".into()));
        }
        let Some((len, after_len)) = parse_line_int(buf, pos + 1)? else { return Ok(None) };
        if len < 0 {
            return Err(CacheProtoError::BadResp2("negative bulk length".into()));
        }
        let len = len as usize;
        let data_end = after_len + len;
        if buf.len() < data_end + 2 {
            return Ok(None);
        }
        args.push(buf[after_len..data_end].to_vec());
        pos = data_end + 2; // skip trailing \r\n
    }
    Ok(Some((args, pos)))
}

fn parse_inline(buf: &[u8]) -> Result<Option<(Vec<Vec<u8>>, usize)>, CacheProtoError> {
    let Some(nl) = find_crlf(buf, 0) else { return Ok(None) };
    let end = if nl > 0 && buf[nl - 1] == b'\r' { nl - 1 } else { nl };
    let line = &buf[..end];
    let args = line
        .split(|b| b.is_ascii_whitespace())
        .filter(|tok| !tok.is_empty())
        .map(|tok| tok.to_vec())
        .collect::<Vec<_>>();
    if args.is_empty() {
        return Err(CacheProtoError::BadInline("empty command line".into()));
    }
    Ok(Some((args, nl + 1)))
}

pub fn encode_simple_string(s: &str) -> Vec<u8> {
    format!("+{s}\r\n").into_bytes()
}

pub fn encode_error(s: &str) -> Vec<u8> {
    format!("-{s}\r\n").into_bytes()
}

pub fn encode_integer(n: i64) -> Vec<u8> {
    format!(":{n}\r\n").into_bytes()
}

pub fn encode_bulk_string(value: Option<&[u8]>) -> Vec<u8> {
    match value {
        None => b"$-1\r\n".to_vec(),
        Some(bytes) => {
            let mut out = format!("${}\r\n", bytes.len()).into_bytes();
            out.extend_from_slice(bytes);
            out.extend_from_slice(b"\r\n");
            out
        }
    }
}

pub fn encode_array(items: &[Vec<u8>]) -> Vec<u8> {
    let mut out = format!("*{}\r\n", items.len()).into_bytes();
    for item in items {
        out.extend_from_slice(&encode_bulk_string(Some(item)));
    }
    out
}

#[cfg(test)]
#[path = "cache_proto_tests.rs"]
mod tests;
