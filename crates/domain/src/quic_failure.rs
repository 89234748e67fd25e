//! Transport failure categories reported by the QUIC layer.
//!
//! The transport maps its own error representation onto this closed set so
//! the recovery policy never has to know which QUIC library produced it.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuicFailureKind {
    /// The peer closed the connection with application error code 0.
    /// Seen when the server restarted while the client still holds the
    /// old session.
    ApplicationClosedNoError,

    /// The connection was torn down after exceeding the idle timeout.
    IdleTimeout,

    /// The server rejected 0-RTT data, usually because its token cache
    /// was cleared by a restart.
    ZeroRttRejected,

    Other,
}

impl QuicFailureKind {
    /// Kinds that mean a previously working connection silently died and
    /// the query can be resent on a fresh one.
    pub fn is_retry_worthy(self) -> bool {
        matches!(
            self,
            Self::ApplicationClosedNoError | Self::IdleTimeout | Self::ZeroRttRejected
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApplicationClosedNoError => "application_closed_no_error",
            Self::IdleTimeout => "idle_timeout",
            Self::ZeroRttRejected => "zero_rtt_rejected",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuicFailure {
    pub kind: QuicFailureKind,
    pub message: String,
}

impl QuicFailure {
    pub fn new(kind: QuicFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(QuicFailureKind::Other, message)
    }
}

impl fmt::Display for QuicFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind.as_str())
    }
}

impl std::error::Error for QuicFailure {}

/// Step of a DoQ exchange an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangePhase {
    Connect,
    OpenStream,
    Write,
    Finish,
    Read,
}

impl fmt::Display for ExchangePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::OpenStream => "open stream",
            Self::Write => "write",
            Self::Finish => "finish",
            Self::Read => "read",
        };
        f.write_str(name)
    }
}
