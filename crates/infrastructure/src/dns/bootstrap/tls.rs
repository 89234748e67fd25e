use ferrous_doq_domain::DomainError;
use std::io::BufReader;
use std::sync::Arc;

/// ALPN token for DNS-over-QUIC (RFC 9250 section 4.1.1).
pub const DOQ_ALPN: &[u8] = b"doq";

/// Builds the rustls client configuration used for DoQ connections.
///
/// Session resumption is kept in memory and early data is enabled so that
/// reconnections can attempt 0-RTT.
pub fn build_client_config(roots: rustls::RootCertStore) -> Arc<rustls::ClientConfig> {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let mut tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    tls_config.alpn_protocols = vec![DOQ_ALPN.to_vec()];
    tls_config.resumption = rustls::client::Resumption::in_memory_sessions(64);
    tls_config.enable_early_data = true;

    Arc::new(tls_config)
}

pub fn webpki_root_store() -> rustls::RootCertStore {
    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    root_store
}

/// Loads a PEM bundle into a fresh root store.
pub fn load_root_store(path: &str) -> Result<rustls::RootCertStore, DomainError> {
    let file = std::fs::File::open(path)
        .map_err(|e| DomainError::ConfigError(format!("Failed to open CA file {}: {}", path, e)))?;
    let mut reader = BufReader::new(file);

    let mut root_store = rustls::RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut reader) {
        let cert = cert.map_err(|e| {
            DomainError::ConfigError(format!("Invalid certificate in {}: {}", path, e))
        })?;
        root_store.add(cert).map_err(|e| {
            DomainError::ConfigError(format!("Rejected certificate in {}: {}", path, e))
        })?;
    }

    if root_store.is_empty() {
        return Err(DomainError::ConfigError(format!(
            "No certificates found in {}",
            path
        )));
    }

    Ok(root_store)
}
