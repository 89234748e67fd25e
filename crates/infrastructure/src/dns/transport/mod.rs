pub mod framing;
pub mod quic;

use crate::dns::bootstrap::{tls, Bootstrapper, HostBootstrapper};
use ferrous_doq_domain::config::UpstreamConfig;
use ferrous_doq_domain::DomainError;
use std::sync::Arc;
use tracing::info;

pub use quic::DoqUpstream;

/// Builds a DoQ upstream from configuration, backed by quinn.
#[cfg(feature = "dns-over-quic")]
pub fn create_doq_upstream(config: &UpstreamConfig) -> Result<DoqUpstream, DomainError> {
    let boot = create_bootstrapper(config)?;
    Ok(DoqUpstream::new(boot, Arc::new(quic::QuinnConnector::new())))
}

pub fn create_bootstrapper(config: &UpstreamConfig) -> Result<Arc<dyn Bootstrapper>, DomainError> {
    let url = config.url().map_err(DomainError::InvalidUpstreamUrl)?;

    let boot = match &config.ca_file {
        Some(path) => {
            info!(upstream = %url, ca_file = %path, "Using custom CA bundle");
            HostBootstrapper::with_root_store(url, config.timeout(), tls::load_root_store(path)?)
        }
        None => HostBootstrapper::new(url, config.timeout()),
    };

    Ok(Arc::new(boot))
}
