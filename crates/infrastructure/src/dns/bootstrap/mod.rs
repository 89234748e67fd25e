//! Upstream bootstrapping: address resolution, TLS material and the dial
//! function used to pick a reachable address.

pub mod resolver;
pub mod tls;

use async_trait::async_trait;
use ferrous_doq_domain::{DoqUpstreamUrl, DomainError, UpstreamAddr};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::OnceCell;
use tracing::debug;

/// Material needed to open a QUIC connection to one upstream.
pub struct Bootstrap {
    pub server_name: Arc<str>,
    pub tls_config: Arc<rustls::ClientConfig>,
    pub dialer: UdpDialer,
}

#[async_trait]
pub trait Bootstrapper: Send + Sync {
    fn url(&self) -> &DoqUpstreamUrl;

    /// Deadline for connection opening and for every stream operation.
    fn timeout(&self) -> Duration;

    async fn bootstrap(&self) -> Result<Bootstrap, DomainError>;
}

/// Connects UDP sockets to the first reachable candidate address.
///
/// A connected UDP socket sends nothing; connecting only asks the OS for a
/// route, which is how unreachable address families get skipped.
#[derive(Debug, Clone)]
pub struct UdpDialer {
    candidates: Vec<SocketAddr>,
    timeout: Duration,
}

impl UdpDialer {
    pub fn new(candidates: Vec<SocketAddr>, timeout: Duration) -> Self {
        Self {
            candidates,
            timeout,
        }
    }

    pub fn candidates(&self) -> &[SocketAddr] {
        &self.candidates
    }

    pub async fn dial(&self) -> Result<UdpSocket, DomainError> {
        let mut last_error = None;

        for candidate in &self.candidates {
            match tokio::time::timeout(self.timeout, connect_udp(*candidate)).await {
                Ok(Ok(socket)) => return Ok(socket),
                Ok(Err(e)) => {
                    debug!(addr = %candidate, error = %e, "UDP candidate unreachable");
                    last_error = Some(e.to_string());
                }
                Err(_) => {
                    last_error = Some(format!("timed out connecting to {}", candidate));
                }
            }
        }

        Err(DomainError::Bootstrap {
            upstream: format!("{:?}", self.candidates),
            reason: last_error.unwrap_or_else(|| "no candidate addresses".to_string()),
        })
    }
}

async fn connect_udp(remote: SocketAddr) -> std::io::Result<UdpSocket> {
    let local: SocketAddr = if remote.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };

    let socket = UdpSocket::bind(local).await?;
    socket.connect(remote).await?;
    Ok(socket)
}

/// Default bootstrapper: system resolver plus a static rustls configuration.
///
/// Resolution happens once; later calls reuse the cached addresses.
pub struct HostBootstrapper {
    url: DoqUpstreamUrl,
    timeout: Duration,
    tls_config: Arc<rustls::ClientConfig>,
    resolved: OnceCell<Vec<SocketAddr>>,
}

impl HostBootstrapper {
    /// Uses the webpki root certificates.
    pub fn new(url: DoqUpstreamUrl, timeout: Duration) -> Self {
        Self::with_root_store(url, timeout, tls::webpki_root_store())
    }

    pub fn with_root_store(
        url: DoqUpstreamUrl,
        timeout: Duration,
        roots: rustls::RootCertStore,
    ) -> Self {
        Self {
            url,
            timeout,
            tls_config: tls::build_client_config(roots),
            resolved: OnceCell::new(),
        }
    }

    async fn resolve(&self) -> Result<Vec<SocketAddr>, DomainError> {
        let addrs = self
            .resolved
            .get_or_try_init(|| async {
                match self.url.addr() {
                    UpstreamAddr::Resolved(addr) => Ok::<_, DomainError>(vec![*addr]),
                    UpstreamAddr::Unresolved { hostname, port } => {
                        let addrs = resolver::resolve_all(hostname, *port, self.timeout).await?;
                        debug!(upstream = %self.url, count = addrs.len(), "Resolved DoQ upstream");
                        Ok(addrs)
                    }
                }
            })
            .await?;

        Ok(addrs.clone())
    }
}

#[async_trait]
impl Bootstrapper for HostBootstrapper {
    fn url(&self) -> &DoqUpstreamUrl {
        &self.url
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bootstrap(&self) -> Result<Bootstrap, DomainError> {
        let candidates = self.resolve().await.map_err(|e| match e {
            DomainError::Bootstrap { reason, .. } => DomainError::Bootstrap {
                upstream: self.url.to_string(),
                reason,
            },
            other => other,
        })?;

        Ok(Bootstrap {
            server_name: self.url.hostname().into(),
            tls_config: self.tls_config.clone(),
            dialer: UdpDialer::new(candidates, self.timeout),
        })
    }
}
