#![allow(dead_code)]
use async_trait::async_trait;
use ferrous_doq_domain::{QuicFailure, QuicFailureKind};
use ferrous_doq_infrastructure::dns::transport::quic::{
    CloseCode, DialRequest, DoqStream, QuicConnector, QuicSession,
};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

/// How the next opened stream behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamScript {
    /// Echo the question back as a response, a few bytes per read.
    Respond,
    /// Same as `Respond`, with a pause before every read.
    RespondSlowly(Duration),
    FailWrite(QuicFailureKind),
    FailRead(QuicFailureKind),
    /// Send half of the response, then fail.
    PartialThenFail(QuicFailureKind),
    /// Overstate the length prefix, send the whole message, then fail.
    OverstatedThenFail(QuicFailureKind),
    /// Finish the stream without sending anything.
    Empty,
    /// Never answer; fails once the session is closed.
    Stall,
}

#[derive(Debug, Default)]
pub struct MockStats {
    pub dials: usize,
    pub streams: usize,
    pub live: usize,
    pub max_live: usize,
    pub wire_ids: Vec<u16>,
    pub close_codes: Vec<CloseCode>,
    pub token_generations: Vec<u64>,
}

#[derive(Default)]
struct Script {
    dial_failures: VecDeque<QuicFailureKind>,
    open_failures: VecDeque<QuicFailureKind>,
    streams: VecDeque<StreamScript>,
}

/// Scriptable in-memory QUIC connector.
#[derive(Clone, Default)]
pub struct MockConnector {
    stats: Arc<Mutex<MockStats>>,
    script: Arc<Mutex<Script>>,
    connect_delay: Option<Duration>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_delay(delay: Duration) -> Self {
        Self {
            connect_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn fail_next_dial(&self, kind: QuicFailureKind) {
        self.script.lock().unwrap().dial_failures.push_back(kind);
    }

    pub fn fail_next_open(&self, kind: QuicFailureKind) {
        self.script.lock().unwrap().open_failures.push_back(kind);
    }

    pub fn push_stream(&self, behavior: StreamScript) {
        self.script.lock().unwrap().streams.push_back(behavior);
    }

    pub fn dials(&self) -> usize {
        self.stats.lock().unwrap().dials
    }

    pub fn streams(&self) -> usize {
        self.stats.lock().unwrap().streams
    }

    pub fn live(&self) -> usize {
        self.stats.lock().unwrap().live
    }

    pub fn max_live(&self) -> usize {
        self.stats.lock().unwrap().max_live
    }

    pub fn wire_ids(&self) -> Vec<u16> {
        self.stats.lock().unwrap().wire_ids.clone()
    }

    pub fn close_codes(&self) -> Vec<CloseCode> {
        self.stats.lock().unwrap().close_codes.clone()
    }

    pub fn token_generations(&self) -> Vec<u64> {
        self.stats.lock().unwrap().token_generations.clone()
    }
}

#[async_trait]
impl QuicConnector for MockConnector {
    async fn connect(&self, request: DialRequest<'_>) -> Result<Arc<dyn QuicSession>, QuicFailure> {
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }

        let generation = request.transport.token_store().generation();
        let failure = self.script.lock().unwrap().dial_failures.pop_front();

        let mut stats = self.stats.lock().unwrap();
        stats.dials += 1;
        stats.token_generations.push(generation);

        if let Some(kind) = failure {
            return Err(QuicFailure::new(kind, "scripted dial failure"));
        }

        stats.live += 1;
        stats.max_live = stats.max_live.max(stats.live);

        Ok(Arc::new(MockSession {
            remote: request.remote,
            stats: self.stats.clone(),
            script: self.script.clone(),
            closed_with: Arc::new(OnceLock::new()),
        }))
    }
}

struct MockSession {
    remote: SocketAddr,
    stats: Arc<Mutex<MockStats>>,
    script: Arc<Mutex<Script>>,
    closed_with: Arc<OnceLock<CloseCode>>,
}

#[async_trait]
impl QuicSession for MockSession {
    async fn open_stream(&self) -> Result<Box<dyn DoqStream>, QuicFailure> {
        let (open_failure, behavior) = {
            let mut script = self.script.lock().unwrap();
            match script.open_failures.pop_front() {
                Some(kind) => (Some(kind), StreamScript::Respond),
                None => (
                    None,
                    script.streams.pop_front().unwrap_or(StreamScript::Respond),
                ),
            }
        };

        if let Some(kind) = open_failure {
            return Err(QuicFailure::new(kind, "scripted open failure"));
        }
        if let Some(failure) = closed_failure(&self.closed_with) {
            return Err(failure);
        }

        self.stats.lock().unwrap().streams += 1;

        Ok(Box::new(MockStream {
            behavior,
            stats: self.stats.clone(),
            closed_with: self.closed_with.clone(),
            written: Vec::new(),
            response: Vec::new(),
            pos: 0,
            reads: 0,
        }))
    }

    fn close(&self, code: CloseCode, _reason: &[u8]) -> Result<(), QuicFailure> {
        if self.closed_with.set(code).is_ok() {
            let mut stats = self.stats.lock().unwrap();
            stats.live -= 1;
            stats.close_codes.push(code);
        }
        Ok(())
    }

    fn remote_address(&self) -> SocketAddr {
        self.remote
    }
}

const CHUNK: usize = 7;

/// Mirrors how quinn fails streams and opens on a connection this side closed.
fn closed_failure(closed_with: &OnceLock<CloseCode>) -> Option<QuicFailure> {
    closed_with.get().map(|code| match code {
        CloseCode::NoError => {
            QuicFailure::new(QuicFailureKind::ApplicationClosedNoError, "closed")
        }
        CloseCode::InternalError => QuicFailure::other("closed"),
    })
}

struct MockStream {
    behavior: StreamScript,
    stats: Arc<Mutex<MockStats>>,
    closed_with: Arc<OnceLock<CloseCode>>,
    written: Vec<u8>,
    response: Vec<u8>,
    pos: usize,
    reads: usize,
}

impl MockStream {
    /// Turns the framed query into a framed response by setting the QR bit.
    fn build_response(&mut self) {
        if self.written.len() < 4 {
            return;
        }

        let body = &self.written[2..];
        self.stats
            .lock()
            .unwrap()
            .wire_ids
            .push(u16::from_be_bytes([body[0], body[1]]));

        let mut response = self.written.clone();
        response[4] |= 0x80;

        if let StreamScript::OverstatedThenFail(_) = self.behavior {
            let declared = u16::from_be_bytes([response[0], response[1]]) + 10;
            response[..2].copy_from_slice(&declared.to_be_bytes());
        }

        self.response = response;
    }
}

#[async_trait]
impl DoqStream for MockStream {
    async fn write_all(&mut self, buf: &[u8]) -> Result<(), QuicFailure> {
        if let StreamScript::FailWrite(kind) = self.behavior {
            return Err(QuicFailure::new(kind, "scripted write failure"));
        }
        if let Some(failure) = closed_failure(&self.closed_with) {
            return Err(failure);
        }
        self.written.extend_from_slice(buf);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), QuicFailure> {
        self.build_response();
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, QuicFailure> {
        self.reads += 1;

        if let Some(failure) = closed_failure(&self.closed_with) {
            return Err(failure);
        }

        let available = match self.behavior {
            StreamScript::FailRead(kind) => {
                return Err(QuicFailure::new(kind, "scripted read failure"));
            }
            StreamScript::Stall => loop {
                tokio::time::sleep(Duration::from_millis(5)).await;
                if let Some(failure) = closed_failure(&self.closed_with) {
                    return Err(failure);
                }
            },
            StreamScript::Empty => return Ok(0),
            StreamScript::RespondSlowly(delay) => {
                tokio::time::sleep(delay).await;
                if let Some(failure) = closed_failure(&self.closed_with) {
                    return Err(failure);
                }
                self.response.len()
            }
            StreamScript::PartialThenFail(_) => self.response.len() / 2,
            _ => self.response.len(),
        };

        if self.pos >= available {
            return match self.behavior {
                StreamScript::PartialThenFail(kind) | StreamScript::OverstatedThenFail(kind) => {
                    Err(QuicFailure::new(kind, "scripted failure after data"))
                }
                _ => Ok(0),
            };
        }

        let n = CHUNK.min(available - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.response[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
