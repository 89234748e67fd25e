#![allow(dead_code)]
use rustls::pki_types::{CertificateDer, PrivatePkcs8KeyDer};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Minimal DoQ server on loopback with a self-signed certificate.
///
/// Answers every A query with 127.0.0.1 and records the message IDs it
/// receives on the wire.
pub struct DoqTestServer {
    addr: SocketAddr,
    cert: CertificateDer<'static>,
    endpoint: quinn::Endpoint,
    connections: Arc<Mutex<Vec<quinn::Connection>>>,
    accepted: Arc<AtomicUsize>,
    wire_ids: Arc<Mutex<Vec<u16>>>,
    task: JoinHandle<()>,
}

impl DoqTestServer {
    pub async fn start() -> Self {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let certified =
            rcgen::generate_simple_self_signed(vec!["localhost".to_string(), "127.0.0.1".to_string()])
                .unwrap();
        let cert = certified.cert.der().clone();
        let key = PrivatePkcs8KeyDer::from(certified.key_pair.serialize_der());

        let mut tls = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![cert.clone()], key.into())
            .unwrap();
        tls.alpn_protocols = vec![b"doq".to_vec()];
        tls.max_early_data_size = u32::MAX;

        let crypto = quinn::crypto::rustls::QuicServerConfig::try_from(Arc::new(tls)).unwrap();
        let server_config = quinn::ServerConfig::with_crypto(Arc::new(crypto));
        let endpoint =
            quinn::Endpoint::server(server_config, "127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = endpoint.local_addr().unwrap();

        let connections = Arc::new(Mutex::new(Vec::new()));
        let accepted = Arc::new(AtomicUsize::new(0));
        let wire_ids = Arc::new(Mutex::new(Vec::new()));

        let task = tokio::spawn(Self::accept_loop(
            endpoint.clone(),
            connections.clone(),
            accepted.clone(),
            wire_ids.clone(),
        ));

        Self {
            addr,
            cert,
            endpoint,
            connections,
            accepted,
            wire_ids,
            task,
        }
    }

    pub fn url(&self) -> String {
        format!("quic://127.0.0.1:{}", self.addr.port())
    }

    pub fn root_store(&self) -> rustls::RootCertStore {
        let mut roots = rustls::RootCertStore::empty();
        roots.add(self.cert.clone()).unwrap();
        roots
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    pub fn wire_ids(&self) -> Vec<u16> {
        self.wire_ids.lock().unwrap().clone()
    }

    /// Closes every accepted connection with application code 0, the way a
    /// restarting server does.
    pub fn close_connections(&self) {
        for conn in self.connections.lock().unwrap().drain(..) {
            conn.close(0u32.into(), b"");
        }
    }

    async fn accept_loop(
        endpoint: quinn::Endpoint,
        connections: Arc<Mutex<Vec<quinn::Connection>>>,
        accepted: Arc<AtomicUsize>,
        wire_ids: Arc<Mutex<Vec<u16>>>,
    ) {
        while let Some(incoming) = endpoint.accept().await {
            let connections = connections.clone();
            let accepted = accepted.clone();
            let wire_ids = wire_ids.clone();

            tokio::spawn(async move {
                let Ok(conn) = incoming.await else {
                    return;
                };
                accepted.fetch_add(1, Ordering::SeqCst);
                connections.lock().unwrap().push(conn.clone());

                while let Ok((send, recv)) = conn.accept_bi().await {
                    tokio::spawn(Self::serve_stream(send, recv, wire_ids.clone()));
                }
            });
        }
    }

    async fn serve_stream(
        mut send: quinn::SendStream,
        mut recv: quinn::RecvStream,
        wire_ids: Arc<Mutex<Vec<u16>>>,
    ) {
        let Ok(framed) = recv.read_to_end(65537).await else {
            return;
        };
        if framed.len() < 14 {
            return;
        }

        let query = &framed[2..];
        wire_ids
            .lock()
            .unwrap()
            .push(u16::from_be_bytes([query[0], query[1]]));

        let response = build_a_response(query);
        let mut out = Vec::with_capacity(response.len() + 2);
        out.extend_from_slice(&(response.len() as u16).to_be_bytes());
        out.extend_from_slice(&response);

        if send.write_all(&out).await.is_ok() {
            let _ = send.finish();
        }
    }
}

impl Drop for DoqTestServer {
    fn drop(&mut self) {
        self.endpoint.close(0u32.into(), b"");
        self.task.abort();
    }
}

/// Copies the question and appends one A record pointing at 127.0.0.1.
fn build_a_response(query: &[u8]) -> Vec<u8> {
    let mut response = Vec::with_capacity(query.len() + 16);

    response.extend_from_slice(&query[0..2]);
    response.push(0x81);
    response.push(0x80);
    response.extend_from_slice(&query[4..6]);
    response.extend_from_slice(&[0x00, 0x01]);
    response.extend_from_slice(&[0x00, 0x00]);
    response.extend_from_slice(&[0x00, 0x00]);
    response.extend_from_slice(&query[12..]);
    response.extend_from_slice(&[
        0xc0, 0x0c, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x3c, 0x00, 0x04, 127, 0, 0, 1,
    ]);

    response
}
