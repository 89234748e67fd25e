//! [`QuicConnector`] backed by quinn.

use super::session::{CloseCode, DialRequest, DoqStream, QuicConnector, QuicSession};
use super::token_store::TokenStore;
use async_trait::async_trait;
use bytes::Bytes;
use ferrous_doq_domain::{QuicFailure, QuicFailureKind};
use quinn::crypto::rustls::QuicClientConfig;
use quinn::{ConnectionError, ReadError, VarInt, WriteError};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::{Arc, OnceLock};
use tracing::debug;

impl quinn::TokenStore for TokenStore {
    fn insert(&self, server_name: &str, token: Bytes) {
        TokenStore::insert(self, server_name, token);
    }

    fn take(&self, server_name: &str) -> Option<Bytes> {
        TokenStore::take(self, server_name)
    }
}

/// Dials every connection from its own client endpoint so no socket outlives
/// the runtime that created it.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuinnConnector;

impl QuinnConnector {
    pub fn new() -> Self {
        Self
    }
}

fn client_config(request: &DialRequest<'_>) -> Result<quinn::ClientConfig, QuicFailure> {
    let crypto = QuicClientConfig::try_from(request.tls_config.clone())
        .map_err(|e| QuicFailure::other(format!("invalid QUIC TLS config: {}", e)))?;

    let mut transport = quinn::TransportConfig::default();
    transport.keep_alive_interval(Some(request.transport.keep_alive_period()));
    // DoQ only uses bidirectional streams.
    transport.max_concurrent_uni_streams(VarInt::from_u32(0));

    let token_store: Arc<dyn quinn::TokenStore> = request.transport.token_store().clone();

    let mut config = quinn::ClientConfig::new(Arc::new(crypto));
    config.transport_config(Arc::new(transport));
    config.token_store(token_store);
    Ok(config)
}

#[async_trait]
impl QuicConnector for QuinnConnector {
    async fn connect(&self, request: DialRequest<'_>) -> Result<Arc<dyn QuicSession>, QuicFailure> {
        let config = client_config(&request)?;

        let local: SocketAddr = if request.remote.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let endpoint = quinn::Endpoint::client(local)
            .map_err(|e| QuicFailure::other(format!("failed to bind QUIC endpoint: {}", e)))?;

        let connecting = endpoint
            .connect_with(config, request.remote, request.server_name)
            .map_err(|e| QuicFailure::other(format!("failed to initiate QUIC connection: {}", e)))?;

        let connection = match connecting.into_0rtt() {
            Ok((connection, _accepted)) => {
                debug!(remote = %request.remote, "Resumed QUIC session with 0-RTT");
                connection
            }
            Err(connecting) => connecting
                .await
                .map_err(|e| classify_connection_error(e, None))?,
        };

        Ok(Arc::new(QuinnSession {
            connection,
            closed_with: Arc::new(OnceLock::new()),
            _endpoint: endpoint,
        }))
    }
}

pub struct QuinnSession {
    connection: quinn::Connection,
    /// First code this side closed with; shared with every stream of the session.
    closed_with: Arc<OnceLock<CloseCode>>,
    _endpoint: quinn::Endpoint,
}

#[async_trait]
impl QuicSession for QuinnSession {
    async fn open_stream(&self) -> Result<Box<dyn DoqStream>, QuicFailure> {
        let (send, recv) = self
            .connection
            .open_bi()
            .await
            .map_err(|e| classify_connection_error(e, self.closed_with.get().copied()))?;

        Ok(Box::new(QuinnStream {
            send,
            recv,
            closed_with: self.closed_with.clone(),
        }))
    }

    fn close(&self, code: CloseCode, reason: &[u8]) -> Result<(), QuicFailure> {
        // Must be recorded before quinn wakes pending streams with LocallyClosed.
        let _ = self.closed_with.set(code);
        self.connection.close(VarInt::from_u32(code.code()), reason);
        Ok(())
    }

    fn remote_address(&self) -> SocketAddr {
        self.connection.remote_address()
    }
}

struct QuinnStream {
    send: quinn::SendStream,
    recv: quinn::RecvStream,
    closed_with: Arc<OnceLock<CloseCode>>,
}

#[async_trait]
impl DoqStream for QuinnStream {
    async fn write_all(&mut self, buf: &[u8]) -> Result<(), QuicFailure> {
        let closed_with = &self.closed_with;
        self.send
            .write_all(buf)
            .await
            .map_err(|e| classify_write_error(e, closed_with.get().copied()))
    }

    fn finish(&mut self) -> Result<(), QuicFailure> {
        self.send
            .finish()
            .map_err(|e| QuicFailure::other(e.to_string()))
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, QuicFailure> {
        match self.recv.read(buf).await {
            Ok(Some(n)) => Ok(n),
            Ok(None) => Ok(0),
            Err(e) => Err(classify_read_error(e, self.closed_with.get().copied())),
        }
    }
}

/// `local_close` is the code this side closed the connection with, if any.
/// quinn reports our own close as `LocallyClosed` without the code, so a
/// routine NoError replacement is classified like a peer NoError close.
pub(crate) fn classify_connection_error(
    err: ConnectionError,
    local_close: Option<CloseCode>,
) -> QuicFailure {
    let kind = match &err {
        ConnectionError::ApplicationClosed(close) if close.error_code.into_inner() == 0 => {
            QuicFailureKind::ApplicationClosedNoError
        }
        ConnectionError::LocallyClosed if local_close == Some(CloseCode::NoError) => {
            QuicFailureKind::ApplicationClosedNoError
        }
        ConnectionError::TimedOut => QuicFailureKind::IdleTimeout,
        _ => QuicFailureKind::Other,
    };
    QuicFailure::new(kind, err.to_string())
}

pub(crate) fn classify_write_error(err: WriteError, local_close: Option<CloseCode>) -> QuicFailure {
    match err {
        WriteError::ConnectionLost(e) => classify_connection_error(e, local_close),
        WriteError::ZeroRttRejected => {
            QuicFailure::new(QuicFailureKind::ZeroRttRejected, err.to_string())
        }
        other => QuicFailure::other(other.to_string()),
    }
}

pub(crate) fn classify_read_error(err: ReadError, local_close: Option<CloseCode>) -> QuicFailure {
    match err {
        ReadError::ConnectionLost(e) => classify_connection_error(e, local_close),
        ReadError::ZeroRttRejected => {
            QuicFailure::new(QuicFailureKind::ZeroRttRejected, err.to_string())
        }
        other => QuicFailure::other(other.to_string()),
    }
}
