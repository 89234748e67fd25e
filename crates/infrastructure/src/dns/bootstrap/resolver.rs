use ferrous_doq_domain::DomainError;
use std::net::SocketAddr;
use std::time::Duration;

/// Resolves a hostname to all its IP addresses (IPv4 + IPv6).
pub async fn resolve_all(
    hostname: &str,
    port: u16,
    timeout: Duration,
) -> Result<Vec<SocketAddr>, DomainError> {
    let target = format!("{}:{}", hostname, port);

    let addrs_iter = tokio::time::timeout(timeout, tokio::net::lookup_host(&target))
        .await
        .map_err(|_| DomainError::Bootstrap {
            upstream: target.clone(),
            reason: format!("resolution timed out after {:?}", timeout),
        })?
        .map_err(|e| DomainError::Bootstrap {
            upstream: target.clone(),
            reason: format!("resolution failed: {}", e),
        })?;

    let addrs: Vec<SocketAddr> = addrs_iter.collect();

    if addrs.is_empty() {
        return Err(DomainError::Bootstrap {
            upstream: target,
            reason: "no addresses found".to_string(),
        });
    }

    Ok(addrs)
}
