// SPDX-License-Identifier: MIT

//! Minimal HTTP: request-line parsing for the server runtime's
//! first-byte protocol discriminator and a static-file response
//! builder for HTTP static mode.

use std::path::{Component, Path, PathBuf};

use crate::error::HttpError;

/// The three request methods the discriminator recognizes before
/// falling back to raw-bytes mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Head,
}

impl Method {
    pub fn sniff(buf: &[u8]) -> Option<Self> {
        if buf.starts_with(b"GET ") {
            Some(Self::Get)
        } else if buf.starts_with(b"POST ") {
            Some(Self::Post)
        } else if buf.starts_with(b"HEAD ") {
            Some(Self::Head)
        } else {
            None
        }
    }
}

pub struct HttpRequest {
    pub method: Method,
    pub path: String,
}

/// Parse a request line + header block from the front of `buf`.
/// `Ok(None)` means `buf` doesn't yet hold a complete header block.
/// On success, also returns how many bytes the header block occupied
/// so the caller can retain any pipelined bytes after it.
pub fn parse_request(buf: &[u8]) -> Result<Option<(HttpRequest, usize)>, HttpError> {
    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut request = httparse::Request::new(&mut headers);
    let status = request.parse(buf).map_err(|e| HttpError::BadRequest(e.to_string()))?;
    let httparse::Status::Complete(consumed) = status else { return Ok(None) };
    let method = match request.method {
        Some("GET") => Method::Get,
        Some("POST") => Method::Post,
        Some("HEAD") => Method::Head,
        other => return Err(HttpError::BadRequest(format!("unsupported method {other:?}"))),
    };
    let path = request.path.ok_or_else(|| HttpError::BadRequest("missing path".into()))?.to_string();
    Ok(Some((HttpRequest { method, path }, consumed)))
}

/// Resolve a request path under `root`, rejecting `..` traversal.
/// Returns `None` for any path that would escape `root`.
pub fn resolve_under_root(root: &Path, url_path: &str) -> Option<PathBuf> {
    let url_path = url_path.split('?').next().unwrap_or(url_path);
    let relative = url_path.trim_start_matches('/');
    let relative = if relative.is_empty() { "index.html" } else { relative };

    let mut resolved = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}

pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Build a full HTTP/1.1 response with a `Content-Length` header.
pub fn build_response(status_code: u16, reason: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "HTTP/1.1 {status_code} {reason}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: keep-alive\r\n\r\n",
        body.len()
    )
    .into_bytes();
    out.extend_from_slice(body);
    out
}

pub fn not_found() -> Vec<u8> {
    build_response(404, "Not Found", "text/plain; charset=utf-8", b"not found")
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
