#[cfg(feature = "dns-over-quic")]
pub mod doq_server;
pub mod mock_quic;

pub use builders::{BootstrapBuilder, QueryBuilder};
#[cfg(feature = "dns-over-quic")]
pub use doq_server::DoqTestServer;
pub use mock_quic::{MockConnector, StreamScript};
