use super::buffer_pool::PoolStats;
use super::connection::ConnectionManager;
use super::exchange::MessageExchange;
use super::retry::{is_retry_worthy, MAX_RETRIES};
use super::session::{CloseCode, QuicConnector};
use crate::dns::bootstrap::Bootstrapper;
use crate::dns::upstream::Upstream;
use async_trait::async_trait;
use ferrous_doq_domain::DomainError;
use hickory_proto::op::Message;
use std::sync::Arc;
use tracing::debug;

/// DNS-over-QUIC upstream (RFC 9250).
///
/// All queries share one QUIC connection, each on its own bidirectional
/// stream. A connection that silently died is re-created and the query
/// resent, but only when it had been working before the query started.
pub struct DoqUpstream {
    exchange: MessageExchange,
}

impl DoqUpstream {
    pub fn new(boot: Arc<dyn Bootstrapper>, connector: Arc<dyn QuicConnector>) -> Self {
        Self {
            exchange: MessageExchange::new(ConnectionManager::new(boot, connector)),
        }
    }

    pub async fn has_connection(&self) -> bool {
        self.exchange.connections().has_connection().await
    }

    /// Closes the active connection with the NoError code. Safe to call
    /// repeatedly; the upstream reconnects on the next query.
    pub async fn close(&self) {
        self.exchange
            .connections()
            .close_conn_with_error(CloseCode::NoError)
            .await;
    }

    /// Response buffer statistics, once the first response has been read.
    pub fn buffer_pool_stats(&self) -> Option<PoolStats> {
        self.exchange.pool_if_created().map(|pool| pool.stats())
    }
}

#[async_trait]
impl Upstream for DoqUpstream {
    fn address(&self) -> &str {
        self.exchange.connections().address()
    }

    async fn exchange(&self, query: &Message) -> Result<Message, DomainError> {
        // A failure on the very first connection is not a stale session,
        // so it is never retried.
        let had_connection = self.has_connection().await;

        let mut result = self.exchange.exchange_once(query).await;

        let mut retries = 0;
        while had_connection && retries < MAX_RETRIES {
            let err = match &result {
                Err(err) if is_retry_worthy(err) => err,
                _ => break,
            };

            debug!(
                upstream = %self.address(),
                error = %err,
                retry = retries + 1,
                "Re-creating DoQ connection and resending query"
            );

            self.exchange
                .connections()
                .close_conn_with_error(CloseCode::NoError)
                .await;

            result = self.exchange.exchange_once(query).await;
            retries += 1;
        }

        if let Err(err) = &result {
            debug!(upstream = %self.address(), error = %err, "DoQ exchange failed");
            self.exchange
                .connections()
                .close_conn_with_error(CloseCode::InternalError)
                .await;
        }

        result
    }
}
