//! Ferrous DoQ Domain Layer
pub mod config;
pub mod errors;
pub mod quic_failure;
pub mod upstream_url;

pub use config::{CliOverrides, Config, ConfigError};
pub use errors::DomainError;
pub use quic_failure::{ExchangePhase, QuicFailure, QuicFailureKind};
pub use upstream_url::{DoqScheme, DoqUpstreamUrl, UpstreamAddr, DEFAULT_DOQ_PORT};
