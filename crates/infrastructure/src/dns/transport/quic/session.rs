//! Seam between the DoQ core and the QUIC implementation.
//!
//! The core only needs to dial, open bidirectional streams and close with an
//! application code. Implementations report failures as [`QuicFailure`]
//! values already tagged with a [`QuicFailureKind`](ferrous_doq_domain::QuicFailureKind).

use super::config::TransportConfig;
use async_trait::async_trait;
use ferrous_doq_domain::QuicFailure;
use std::net::SocketAddr;
use std::sync::Arc;

/// Application-level close codes (RFC 9250 section 4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseCode {
    /// Routine replacement of a connection.
    NoError,
    /// The exchange could not be completed and the connection is abandoned.
    InternalError,
}

impl CloseCode {
    pub fn code(self) -> u32 {
        match self {
            CloseCode::NoError => 0,
            CloseCode::InternalError => 1,
        }
    }
}

/// Everything needed to establish one QUIC session.
pub struct DialRequest<'a> {
    pub remote: SocketAddr,
    pub server_name: &'a str,
    pub tls_config: Arc<rustls::ClientConfig>,
    pub transport: &'a TransportConfig,
}

#[async_trait]
pub trait QuicConnector: Send + Sync {
    async fn connect(&self, request: DialRequest<'_>) -> Result<Arc<dyn QuicSession>, QuicFailure>;
}

#[async_trait]
pub trait QuicSession: Send + Sync {
    async fn open_stream(&self) -> Result<Box<dyn DoqStream>, QuicFailure>;

    fn close(&self, code: CloseCode, reason: &[u8]) -> Result<(), QuicFailure>;

    fn remote_address(&self) -> SocketAddr;
}

/// One bidirectional stream carrying a single query/response pair.
#[async_trait]
pub trait DoqStream: Send {
    async fn write_all(&mut self, buf: &[u8]) -> Result<(), QuicFailure>;

    /// Closes the send direction (STREAM FIN); the receive side stays open.
    fn finish(&mut self) -> Result<(), QuicFailure>;

    /// Reads the next chunk into `buf`. `Ok(0)` means the peer finished the stream.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, QuicFailure>;
}
