use crate::quic_failure::{ExchangePhase, QuicFailure};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    #[error("Invalid upstream URL: {0}")]
    InvalidUpstreamUrl(String),

    #[error("Failed to bootstrap {upstream}: {reason}")]
    Bootstrap { upstream: String, reason: String },

    #[error("Transport timeout during {phase} with {server}")]
    TransportTimeout { server: String, phase: ExchangePhase },

    #[error("QUIC {phase} failed for {upstream}: {failure}")]
    Quic {
        upstream: String,
        phase: ExchangePhase,
        failure: QuicFailure,
    },

    #[error("Failed to pack DNS message for DoQ: {0}")]
    MessageEncoding(String),

    #[error("Invalid DNS response from {upstream}: {reason}")]
    InvalidDnsResponse { upstream: String, reason: String },

    #[error("Empty response from {upstream}")]
    EmptyResponse { upstream: String },

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DomainError {
    /// Returns the transport failure carried by this error, if any.
    pub fn quic_failure(&self) -> Option<&QuicFailure> {
        match self {
            DomainError::Quic { failure, .. } => Some(failure),
            _ => None,
        }
    }
}
