use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

/// Default port for DNS-over-QUIC (RFC 9250 section 4.1.1).
pub const DEFAULT_DOQ_PORT: u16 = 853;

/// Represents an upstream server address that may or may not be resolved to an IP.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UpstreamAddr {
    Resolved(SocketAddr),
    Unresolved { hostname: Arc<str>, port: u16 },
}

impl UpstreamAddr {
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        match self {
            UpstreamAddr::Resolved(addr) => Some(*addr),
            UpstreamAddr::Unresolved { .. } => None,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            UpstreamAddr::Resolved(addr) => addr.port(),
            UpstreamAddr::Unresolved { port, .. } => *port,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, UpstreamAddr::Unresolved { .. })
    }
}

impl fmt::Display for UpstreamAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamAddr::Resolved(addr) => write!(f, "{}", addr),
            UpstreamAddr::Unresolved { hostname, port } => write!(f, "{}:{}", hostname, port),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoqScheme {
    Quic,
    Doq,
}

impl DoqScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoqScheme::Quic => "quic",
            DoqScheme::Doq => "doq",
        }
    }
}

/// A DNS-over-QUIC upstream URL: `quic://host[:port]` or `doq://host[:port]`.
///
/// `hostname` is the TLS server name; for IP literals it is the IP itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DoqUpstreamUrl {
    scheme: DoqScheme,
    hostname: Arc<str>,
    addr: UpstreamAddr,
}

impl DoqUpstreamUrl {
    pub fn scheme(&self) -> DoqScheme {
        self.scheme
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn addr(&self) -> &UpstreamAddr {
        &self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

fn split_host_port(s: &str) -> Result<(&str, Option<u16>), String> {
    if let Some(rest) = s.strip_prefix('[') {
        let end = rest
            .find(']')
            .ok_or_else(|| format!("Unterminated IPv6 literal in '{}'", s))?;
        let host = &rest[..end];
        let tail = &rest[end + 1..];
        if tail.is_empty() {
            return Ok((host, None));
        }
        let port_str = tail
            .strip_prefix(':')
            .ok_or_else(|| format!("Unexpected characters after IPv6 literal in '{}'", s))?;
        let port = port_str
            .parse::<u16>()
            .map_err(|e| format!("Invalid port in '{}': {}", s, e))?;
        return Ok((host, Some(port)));
    }

    match s.rsplit_once(':') {
        Some((host, port_str)) => {
            let port = port_str
                .parse::<u16>()
                .map_err(|e| format!("Invalid port in '{}': {}", s, e))?;
            Ok((host, Some(port)))
        }
        None => Ok((s, None)),
    }
}

impl FromStr for DoqUpstreamUrl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = if let Some(rest) = s.strip_prefix("quic://") {
            (DoqScheme::Quic, rest)
        } else if let Some(rest) = s.strip_prefix("doq://") {
            (DoqScheme::Doq, rest)
        } else {
            return Err(format!(
                "Invalid DoQ upstream '{}'. Expected 'quic://HOST[:PORT]' or 'doq://HOST[:PORT]'",
                s
            ));
        };

        let authority = rest.trim_end_matches('/');
        if authority.contains('/') {
            return Err(format!("DoQ upstream '{}' must not contain a path", s));
        }

        let (host, port) = split_host_port(authority)?;
        if host.is_empty() {
            return Err(format!("Missing host in DoQ upstream '{}'", s));
        }
        let port = port.unwrap_or(DEFAULT_DOQ_PORT);

        let addr = match host.parse::<IpAddr>() {
            Ok(ip) => UpstreamAddr::Resolved(SocketAddr::new(ip, port)),
            Err(_) => UpstreamAddr::Unresolved {
                hostname: host.into(),
                port,
            },
        };

        Ok(Self {
            scheme,
            hostname: host.into(),
            addr,
        })
    }
}

impl fmt::Display for DoqUpstreamUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.addr {
            UpstreamAddr::Resolved(addr) => write!(f, "{}://{}", self.scheme.as_str(), addr),
            UpstreamAddr::Unresolved { hostname, port } => {
                write!(f, "{}://{}:{}", self.scheme.as_str(), hostname, port)
            }
        }
    }
}
