//! DNS-over-QUIC client transport (RFC 9250).

pub mod buffer_pool;
pub mod config;
pub mod connection;
pub mod exchange;
#[cfg(feature = "dns-over-quic")]
pub mod quinn_session;
pub mod retry;
pub mod session;
pub mod token_store;
pub mod upstream;

pub use buffer_pool::{BufferPool, PoolStats, PooledBuffer};
pub use config::{TransportConfig, KEEP_ALIVE_PERIOD};
pub use connection::ConnectionManager;
pub use exchange::MessageExchange;
#[cfg(feature = "dns-over-quic")]
pub use quinn_session::{QuinnConnector, QuinnSession};
pub use retry::{is_retry_worthy, MAX_RETRIES};
pub use session::{CloseCode, DialRequest, DoqStream, QuicConnector, QuicSession};
pub use token_store::TokenStore;
pub use upstream::DoqUpstream;
