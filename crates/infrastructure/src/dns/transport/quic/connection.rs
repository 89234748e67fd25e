use super::config::TransportConfig;
use super::session::{CloseCode, DialRequest, QuicConnector, QuicSession};
use crate::dns::bootstrap::Bootstrapper;
use ferrous_doq_domain::{DomainError, ExchangePhase};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

struct ConnectionState {
    conn: Option<Arc<dyn QuicSession>>,
    transport: TransportConfig,
}

/// Owns the single shared QUIC connection of one upstream.
///
/// Callers that only need an existing connection take the shared lock.
/// Creating, replacing and closing take the exclusive lock, so a connection
/// is never observed half-built and at most one is live at a time.
pub struct ConnectionManager {
    boot: Arc<dyn Bootstrapper>,
    connector: Arc<dyn QuicConnector>,
    address: Arc<str>,
    state: RwLock<ConnectionState>,
}

impl ConnectionManager {
    pub fn new(boot: Arc<dyn Bootstrapper>, connector: Arc<dyn QuicConnector>) -> Self {
        let address: Arc<str> = boot.url().to_string().into();
        Self {
            boot,
            connector,
            address,
            state: RwLock::new(ConnectionState {
                conn: None,
                transport: TransportConfig::new(),
            }),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn boot(&self) -> &Arc<dyn Bootstrapper> {
        &self.boot
    }

    /// Returns the cached connection when `use_cached` is set and one exists;
    /// otherwise closes any existing connection and opens a new one.
    pub async fn get_connection(
        &self,
        use_cached: bool,
    ) -> Result<Arc<dyn QuicSession>, DomainError> {
        if use_cached {
            let state = self.state.read().await;
            if let Some(conn) = &state.conn {
                return Ok(conn.clone());
            }
        }

        let mut state = self.state.write().await;

        // Another caller may have connected while we waited for the lock.
        if use_cached {
            if let Some(conn) = &state.conn {
                return Ok(conn.clone());
            }
        }

        self.close_locked(&mut state, CloseCode::NoError);

        let conn = self.open_connection(&state.transport).await?;
        state.conn = Some(conn.clone());

        Ok(conn)
    }

    pub async fn has_connection(&self) -> bool {
        self.state.write().await.conn.is_some()
    }

    /// Closes the active connection, if any, so the next query starts on a
    /// fresh one with a fresh token store.
    pub async fn close_conn_with_error(&self, code: CloseCode) {
        let mut state = self.state.write().await;
        self.close_locked(&mut state, code);
    }

    fn close_locked(&self, state: &mut ConnectionState, code: CloseCode) {
        let Some(conn) = state.conn.take() else {
            return;
        };

        debug!(upstream = %self.address, code = ?code, "Closing QUIC connection");

        if let Err(e) = conn.close(code, b"") {
            error!(upstream = %self.address, error = %e, "Failed to close the QUIC connection");
        }

        // Tokens tied to the old session may no longer be valid for 0-RTT.
        state.transport.reset_token_store();
    }

    async fn open_connection(
        &self,
        transport: &TransportConfig,
    ) -> Result<Arc<dyn QuicSession>, DomainError> {
        let bootstrap = self.boot.bootstrap().await?;

        // The throwaway socket is never used; dialing it lets the bootstrapper
        // pick the reachable address when both IPv4 and IPv6 are available.
        let socket = bootstrap.dialer.dial().await.map_err(|e| match e {
            DomainError::Bootstrap { reason, .. } => DomainError::Bootstrap {
                upstream: self.address.to_string(),
                reason,
            },
            other => other,
        })?;
        let remote = socket.peer_addr().map_err(|e| {
            DomainError::IoError(format!(
                "failed to read dialed address for {}: {}",
                self.address, e
            ))
        })?;
        drop(socket);

        let timeout = self.boot.timeout();
        let request = DialRequest {
            remote,
            server_name: &bootstrap.server_name,
            tls_config: bootstrap.tls_config.clone(),
            transport,
        };

        let conn = tokio::time::timeout(timeout, self.connector.connect(request))
            .await
            .map_err(|_| DomainError::TransportTimeout {
                server: self.address.to_string(),
                phase: ExchangePhase::Connect,
            })?
            .map_err(|failure| DomainError::Quic {
                upstream: self.address.to_string(),
                phase: ExchangePhase::Connect,
                failure,
            })?;

        debug!(upstream = %self.address, remote = %conn.remote_address(), "Opened QUIC connection");

        Ok(conn)
    }
}
