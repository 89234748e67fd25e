use super::buffer_pool::BufferPool;
use super::connection::ConnectionManager;
use super::session::{DoqStream, QuicSession};
use crate::dns::transport::framing::{self, LENGTH_PREFIX_SIZE, MAX_DNS_MESSAGE_SIZE};
use ferrous_doq_domain::{DomainError, ExchangePhase, QuicFailure};
use hickory_proto::op::Message;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Idle response buffers kept around between exchanges.
const MAX_IDLE_BUFFERS: usize = 64;

/// Sends one query on its own stream of the shared connection.
pub struct MessageExchange {
    connections: ConnectionManager,
    bytes_pool: OnceLock<BufferPool>,
}

impl MessageExchange {
    pub fn new(connections: ConnectionManager) -> Self {
        Self {
            connections,
            bytes_pool: OnceLock::new(),
        }
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    fn address(&self) -> &str {
        self.connections.address()
    }

    fn timeout(&self) -> Duration {
        self.connections.boot().timeout()
    }

    /// Returns the buffer pool, creating it on first use.
    pub fn bytes_pool(&self) -> &BufferPool {
        self.bytes_pool.get_or_init(|| {
            BufferPool::new(MAX_DNS_MESSAGE_SIZE + LENGTH_PREFIX_SIZE, MAX_IDLE_BUFFERS)
        })
    }

    pub(crate) fn pool_if_created(&self) -> Option<&BufferPool> {
        self.bytes_pool.get()
    }

    /// One attempt: open a stream, write the framed query, FIN the send side
    /// and read exactly one framed response.
    ///
    /// The query goes out with ID 0; the response comes back carrying the
    /// query's original ID.
    pub async fn exchange_once(&self, query: &Message) -> Result<Message, DomainError> {
        let conn = self.connections.get_connection(true).await?;

        let framed = framing::pack_query(query)?;

        let mut stream = self.open_stream(conn).await?;

        let deadline = Instant::now() + self.timeout();

        self.within(deadline, ExchangePhase::Write, stream.write_all(&framed))
            .await?;

        // The client MUST signal through STREAM FIN that no further data will
        // be sent. Only the send direction is closed; reading stays possible.
        if let Err(e) = stream.finish() {
            debug!(
                upstream = %self.address(),
                phase = %ExchangePhase::Finish,
                error = %e,
                "Failed to finish QUIC send stream"
            );
        }

        self.read_response(stream.as_mut(), query.id(), deadline)
            .await
    }

    /// Opens a stream on `conn`, reconnecting once if the cached connection
    /// turned out to be unusable.
    async fn open_stream(
        &self,
        conn: Arc<dyn QuicSession>,
    ) -> Result<Box<dyn DoqStream>, DomainError> {
        let timeout = self.timeout();

        match tokio::time::timeout(timeout, conn.open_stream()).await {
            Ok(Ok(stream)) => return Ok(stream),
            Ok(Err(e)) => {
                debug!(upstream = %self.address(), error = %e, "Failed to open QUIC stream, re-creating connection");
            }
            Err(_) => {
                debug!(upstream = %self.address(), "Timed out opening QUIC stream, re-creating connection");
            }
        }

        let conn = self.connections.get_connection(false).await?;

        self.within(
            Instant::now() + timeout,
            ExchangePhase::OpenStream,
            conn.open_stream(),
        )
        .await
    }

    async fn read_response(
        &self,
        stream: &mut dyn DoqStream,
        original_id: u16,
        deadline: Instant,
    ) -> Result<Message, DomainError> {
        let pool = self.bytes_pool();
        let mut buf = pool.acquire();

        let (n, read_error) = self.fill(stream, &mut buf, deadline).await;
        buf.mark_used(n);

        if n == 0 {
            return Err(read_error.unwrap_or_else(|| DomainError::EmptyResponse {
                upstream: self.address().to_string(),
            }));
        }

        match read_error {
            None => framing::parse_response(&mut buf[..n], original_id, self.address()),
            // A short read may still hold a complete message; only keep it if
            // it actually parses.
            Some(read_error) => {
                match framing::parse_response(&mut buf[..n], original_id, self.address()) {
                    Ok(message) => {
                        warn!(
                            upstream = %self.address(),
                            error = %read_error,
                            bytes = n,
                            "Using DoQ response read before stream error"
                        );
                        Ok(message)
                    }
                    Err(_) => Err(read_error),
                }
            }
        }
    }

    /// Reads until the peer finishes the stream, the framed message is
    /// complete or the buffer is full. Returns the byte count together with
    /// the error that stopped reading, if any.
    async fn fill(
        &self,
        stream: &mut dyn DoqStream,
        buf: &mut [u8],
        deadline: Instant,
    ) -> (usize, Option<DomainError>) {
        let mut filled = 0;

        while filled < buf.len() {
            if filled >= LENGTH_PREFIX_SIZE {
                let declared = u16::from_be_bytes([buf[0], buf[1]]) as usize;
                if filled >= LENGTH_PREFIX_SIZE + declared {
                    break;
                }
            }

            match self
                .within(deadline, ExchangePhase::Read, stream.read(&mut buf[filled..]))
                .await
            {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) => return (filled, Some(e)),
            }
        }

        (filled, None)
    }

    async fn within<T, F>(
        &self,
        deadline: Instant,
        phase: ExchangePhase,
        fut: F,
    ) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, QuicFailure>>,
    {
        let remaining = deadline.saturating_duration_since(Instant::now());

        match tokio::time::timeout(remaining, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(failure)) => Err(DomainError::Quic {
                upstream: self.address().to_string(),
                phase,
                failure,
            }),
            Err(_) => Err(DomainError::TransportTimeout {
                server: self.address().to_string(),
                phase,
            }),
        }
    }
}
