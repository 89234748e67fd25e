use super::token_store::TokenStore;
use std::sync::Arc;
use std::time::Duration;

/// Keep-alive period, short enough to keep NAT bindings and the server's
/// idle timer from expiring between queries.
pub const KEEP_ALIVE_PERIOD: Duration = Duration::from_secs(20);

/// QUIC settings shared by every connection of one upstream.
///
/// Only the token store ever changes, and only under the connection
/// manager's exclusive lock.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    keep_alive_period: Duration,
    token_store: Arc<TokenStore>,
}

impl TransportConfig {
    pub fn new() -> Self {
        Self {
            keep_alive_period: KEEP_ALIVE_PERIOD,
            token_store: Arc::new(TokenStore::default()),
        }
    }

    pub fn keep_alive_period(&self) -> Duration {
        self.keep_alive_period
    }

    pub fn token_store(&self) -> &Arc<TokenStore> {
        &self.token_store
    }

    /// Drops the current token store in favour of an empty one.
    pub(crate) fn reset_token_store(&mut self) {
        self.token_store = Arc::new(TokenStore::default());
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new()
    }
}
