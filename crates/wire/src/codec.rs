// SPDX-License-Identifier: MIT

//! Line tokenizer and socket framing for the control protocol.
//!
//! Request framing: one `\n`-terminated line of whitespace-separated
//! tokens (double-quoted tokens may contain spaces). Response framing:
//! one exit-code byte, the UTF-8 body, then a trailing `\0`.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;
use crate::request::Request;
use crate::response::Response;

/// Split a command line into shell-like tokens, honoring double quotes.
pub fn tokenize(line: &str) -> Result<Vec<String>, ProtocolError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            _ => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if in_quotes {
        return Err(ProtocolError::BadCommand("unterminated quote".into()));
    }
    if has_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Parse a tokenized command line into a [`Request`].
///
/// Grammar by example:
/// `create server s1 -p 19000`, `create proxy p1 -p 19080
/// --backend 127.0.0.1:19081,127.0.0.1:19082 --strategy round-robin
/// --protocol tcp`, `start s1 -i`.
pub fn parse_line(line: &str) -> Result<Request, ProtocolError> {
    let tokens = tokenize(line.trim_end_matches(['\r', '\n']))?;
    let (head, rest) = tokens.split_first().ok_or_else(|| {
        ProtocolError::BadCommand("empty command".into())
    })?;

    match head.as_str() {
        "create" => parse_create(rest),
        "start" => {
            let (name, flags) = one_name_then_flags(rest)?;
            Ok(Request::Start { name, interactive: flags.has_flag("-i") })
        }
        "stop" => Ok(Request::Stop { name: require_one(rest, "stop")? }),
        "remove" => Ok(Request::Remove { name: require_one(rest, "remove")? }),
        "ls" => Ok(Request::Ls),
        "ps" => Ok(Request::Ps),
        "stats" => Ok(Request::Stats { name: rest.first().cloned() }),
        "show" => Ok(Request::Show { name: require_one(rest, "show")? }),
        "owner" => {
            let name = rest.first().cloned().ok_or_else(|| missing("owner", "name"))?;
            Ok(Request::Owner { name, owner: rest.get(1).cloned() })
        }
        "send" => {
            let name = rest.first().cloned().ok_or_else(|| missing("send", "name"))?;
            let message = rest.get(1..).map(|s| s.join(" ")).unwrap_or_default();
            Ok(Request::Send { name, message })
        }
        "edit" => {
            if rest.len() < 3 {
                return Err(missing("edit", "name field value"));
            }
            Ok(Request::Edit {
                name: rest[0].clone(),
                field: rest[1].clone(),
                value: rest[2..].join(" "),
            })
        }
        "dump" => Ok(Request::Dump { name: rest.first().cloned() }),
        "import" => Ok(Request::Import { path: require_one(rest, "import")? }),
        "reload-lua" => Ok(Request::ReloadLua { name: require_one(rest, "reload-lua")? }),
        "reload" => Ok(Request::Reload { name: require_one(rest, "reload")? }),
        "attach" => Ok(Request::Attach { name: require_one(rest, "attach")? }),
        "cluster-dir" => Ok(Request::ClusterDir { path: rest.first().cloned() }),
        "action" => {
            if rest.len() < 2 {
                return Err(missing("action", "name verb"));
            }
            Ok(Request::Action {
                name: rest[0].clone(),
                verb: rest[1].clone(),
                args: rest[2..].to_vec(),
            })
        }
        other => Err(ProtocolError::UnknownCommand(other.to_string())),
    }
}

fn missing(cmd: &str, args: &str) -> ProtocolError {
    ProtocolError::BadCommand(format!("{cmd} requires: {args}"))
}

fn require_one(rest: &[String], cmd: &str) -> Result<String, ProtocolError> {
    rest.first().cloned().ok_or_else(|| missing(cmd, "name"))
}

struct Flags<'a>(&'a [String]);

impl Flags<'_> {
    fn has_flag(&self, flag: &str) -> bool {
        self.0.iter().any(|t| t == flag)
    }

    fn value_of(&self, flag: &str) -> Option<&str> {
        self.0.iter().position(|t| t == flag).and_then(|i| self.0.get(i + 1)).map(String::as_str)
    }
}

fn one_name_then_flags(rest: &[String]) -> Result<(String, Flags<'_>), ProtocolError> {
    let name = rest.first().cloned().ok_or_else(|| missing("start", "name"))?;
    Ok((name, Flags(rest)))
}

fn parse_create(rest: &[String]) -> Result<Request, ProtocolError> {
    if rest.len() < 2 {
        return Err(missing("create", "kind name"));
    }
    let kind = rest[0].clone();
    let name = rest[1].clone();
    let flags = Flags(&rest[2..]);

    let port = match flags.value_of("-p").or_else(|| flags.value_of("--port")) {
        Some(v) => {
            Some(v.parse::<u16>().map_err(|_| ProtocolError::BadCommand(format!("bad port: {v}")))?)
        }
        None => None,
    };
    let backend = flags
        .value_of("--backend")
        .map(|v| v.split(',').map(str::to_string).collect())
        .unwrap_or_default();

    Ok(Request::Create {
        kind,
        name,
        port,
        udp: flags.has_flag("--udp"),
        backend,
        strategy: flags.value_of("--strategy").map(str::to_string),
        protocol: flags.value_of("--protocol").map(str::to_string),
        script: flags.value_of("--script").map(str::to_string),
        group: flags.value_of("--group").map(str::to_string),
        owner: flags.value_of("--owner").map(str::to_string),
    })
}

/// Read one `\n`-terminated request line from `reader`.
pub async fn read_request<R>(reader: &mut R, timeout: Duration) -> Result<Request, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = tokio::time::timeout(timeout, reader.read(&mut byte))
            .await
            .map_err(|_| ProtocolError::Timeout)??;
        if n == 0 {
            if line.is_empty() {
                return Err(ProtocolError::ConnectionClosed);
            }
            break;
        }
        if byte[0] == b'\n' {
            break;
        }
        line.push(byte[0]);
    }
    let text = String::from_utf8_lossy(&line);
    parse_line(&text)
}

/// Write a response as `[exit-code-byte] body [0x00]`.
pub async fn write_response<W>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::with_capacity(response.body().len() + 2);
    buf.push(response.exit_code() as u8);
    buf.extend_from_slice(response.body().as_bytes());
    buf.push(0);
    tokio::time::timeout(timeout, writer.write_all(&buf))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    Ok(())
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
