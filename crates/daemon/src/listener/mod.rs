// SPDX-License-Identifier: MIT

//! The control-socket accept loop: each connection gets its own tokio
//! task, reads one command line, dispatches it through
//! [`commands::handle`], writes one framed response, then loops for
//! the next line on the same connection until it closes.

pub mod commands;

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, UnixListener};
use tracing::{debug, warn};

use commands::Context;

pub async fn serve_unix(listener: UnixListener, ctx: Arc<Context>) {
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    let (mut reader, mut writer) = tokio::io::split(stream);
                    serve_connection(&mut reader, &mut writer, &ctx).await;
                });
            }
            Err(e) => warn!("control socket accept failed: {e}"),
        }
    }
}

/// The TCP control listener is opt-in and gated on a shared auth
/// token presented as the first line of the connection.
pub async fn serve_tcp(listener: TcpListener, ctx: Arc<Context>) {
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    let (mut reader, mut writer) = tokio::io::split(stream);
                    if !authenticate(&mut reader).await {
                        return;
                    }
                    serve_connection(&mut reader, &mut writer, &ctx).await;
                });
            }
            Err(e) => warn!("tcp control socket accept failed: {e}"),
        }
    }
}

async fn authenticate<R: AsyncRead + Unpin>(reader: &mut R) -> bool {
    let Some(expected) = crate::env::auth_token() else { return true };
    match sk_wire::read_request(reader, crate::env::ipc_timeout()).await {
        Ok(sk_wire::Request::Action { verb, args, .. }) if verb == "auth" => {
            args.first().is_some_and(|token| token == &expected)
        }
        _ => false,
    }
}

async fn serve_connection<R, W>(reader: &mut R, writer: &mut W, ctx: &Context)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let timeout = crate::env::ipc_timeout();
    loop {
        let request = match sk_wire::read_request(reader, timeout).await {
            Ok(r) => r,
            Err(sk_wire::ProtocolError::ConnectionClosed) => return,
            Err(e) => {
                debug!("control connection protocol error: {e}");
                let response = sk_wire::Response::Error { message: e.to_string() };
                let _ = sk_wire::write_response(writer, &response, timeout).await;
                continue;
            }
        };
        let response = commands::handle(ctx, request).await;
        if sk_wire::write_response(writer, &response, timeout).await.is_err() {
            return;
        }
    }
}
