use ferrous_doq_domain::DomainError;

/// Reconnect-and-resend attempts after the first exchange. Two are needed
/// when an idle connection died AND the server then refuses 0-RTT.
pub const MAX_RETRIES: usize = 2;

/// Whether `err` means a previously working connection silently died, so
/// re-creating it and resending the query is worthwhile.
///
/// Only transport failures are considered; timeouts, bootstrap, encoding
/// and parse errors are terminal.
pub fn is_retry_worthy(err: &DomainError) -> bool {
    err.quic_failure()
        .is_some_and(|failure| failure.kind.is_retry_worthy())
}
