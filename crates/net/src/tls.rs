// SPDX-License-Identifier: MIT

//! TLS envelope over rustls's in-process memory BIO.
//!
//! The reactor never hands runtimes a `Read`/`Write` socket — only
//! completion buffers — so the record layer is driven by feeding raw
//! ciphertext in and draining ciphertext out, rather than by giving
//! rustls a socket of its own.

use std::io::{Cursor, Read, Write};
use std::sync::Arc;

use rustls::pki_types::ServerName;
use rustls::{ClientConnection, ServerConnection};

use crate::error::TlsError;

/// One TLS session, decoupled from the connection's socket fd.
pub struct TlsEnvelope {
    side: rustls::Connection,
}

impl TlsEnvelope {
    pub fn server(config: Arc<rustls::ServerConfig>) -> Result<Self, TlsError> {
        Ok(Self { side: rustls::Connection::Server(ServerConnection::new(config)?) })
    }

    pub fn client(config: Arc<rustls::ClientConfig>, name: ServerName<'static>) -> Result<Self, TlsError> {
        Ok(Self { side: rustls::Connection::Client(ClientConnection::new(config, name)?) })
    }

    fn conn_mut(&mut self) -> &mut rustls::Connection {
        &mut self.side
    }

    fn conn(&self) -> &rustls::Connection {
        &self.side
    }

    /// Feed ciphertext read off the wire into the record layer and run
    /// the TLS state machine. Returns the number of bytes consumed.
    pub fn feed_ciphertext(&mut self, bytes: &[u8]) -> Result<usize, TlsError> {
        let mut cursor = Cursor::new(bytes);
        let n = self.conn_mut().read_tls(&mut cursor)?;
        self.conn_mut().process_new_packets().map_err(TlsError::Protocol)?;
        Ok(n)
    }

    /// Drain application-layer plaintext produced by the last
    /// `feed_ciphertext` call into `out`, returning the byte count.
    pub fn drain_plaintext(&mut self, out: &mut Vec<u8>) -> Result<usize, TlsError> {
        let mut reader = self.conn_mut().reader();
        let start = out.len();
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => out.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(TlsError::Io(e)),
            }
        }
        Ok(out.len() - start)
    }

    /// Encrypt outbound plaintext and return the ciphertext to submit
    /// via the reactor's write/send-zero-copy primitives.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, TlsError> {
        self.conn_mut().writer().write_all(plaintext)?;
        let mut ciphertext = Vec::new();
        while self.conn().wants_write() {
            self.conn_mut().write_tls(&mut ciphertext)?;
        }
        Ok(ciphertext)
    }

    pub fn handshaking(&self) -> bool {
        self.conn().is_handshaking()
    }

    pub fn wants_write(&self) -> bool {
        self.conn().wants_write()
    }
}

/// Load a PEM certificate chain and private key from disk for a
/// server runtime's TLS-accelerated listen path.
pub fn load_server_config(cert_path: &std::path::Path, key_path: &std::path::Path) -> Result<rustls::ServerConfig, TlsError> {
    let cert_file = std::fs::File::open(cert_path)?;
    let certs: Vec<_> = rustls_pemfile::certs(&mut std::io::BufReader::new(cert_file))
        .collect::<Result<_, _>>()?;
    let key_file = std::fs::File::open(key_path)?;
    let key = rustls_pemfile::private_key(&mut std::io::BufReader::new(key_file))?
        .ok_or_else(|| TlsError::Material(format!("no private key found in {}", key_path.display())))?;

    rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(TlsError::Protocol)
}

#[cfg(test)]
#[path = "tls_tests.rs"]
mod tests;
