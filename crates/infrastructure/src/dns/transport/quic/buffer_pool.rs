use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// Pool of fixed-size byte buffers used to read DoQ responses.
///
/// A single size class, so there is nothing to key on. Buffers are handed out
/// as [`PooledBuffer`] guards that scrub and return the buffer on drop,
/// including on error paths.
pub struct BufferPool {
    buffers: Mutex<Vec<Box<[u8]>>>,
    buffer_size: usize,
    max_idle: usize,
    total_created: AtomicU64,
    total_reused: AtomicU64,
}

impl BufferPool {
    pub fn new(buffer_size: usize, max_idle: usize) -> Self {
        debug!(buffer_size, max_idle, "Initializing DoQ buffer pool");

        Self {
            buffers: Mutex::new(Vec::new()),
            buffer_size,
            max_idle,
            total_created: AtomicU64::new(0),
            total_reused: AtomicU64::new(0),
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Borrows a buffer, reusing an idle one when available.
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let reused = self
            .buffers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop();

        let buf = match reused {
            Some(buf) => {
                self.total_reused.fetch_add(1, Ordering::Relaxed);
                buf
            }
            None => {
                self.total_created.fetch_add(1, Ordering::Relaxed);
                vec![0u8; self.buffer_size].into_boxed_slice()
            }
        };

        PooledBuffer {
            buf: Some(buf),
            used: None,
            pool: self,
        }
    }

    fn release(&self, mut buf: Box<[u8]>, used: Option<usize>) {
        let used = used.unwrap_or(buf.len()).min(buf.len());
        buf[..used].fill(0);

        let mut buffers = self.buffers.lock().unwrap_or_else(|e| e.into_inner());
        if buffers.len() < self.max_idle {
            buffers.push(buf);
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            idle: self.buffers.lock().unwrap_or_else(|e| e.into_inner()).len(),
            total_created: self.total_created.load(Ordering::Relaxed),
            total_reused: self.total_reused.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub idle: usize,
    pub total_created: u64,
    pub total_reused: u64,
}

/// Buffer borrowed from a [`BufferPool`]; returned automatically when dropped.
///
/// Only the prefix reported through [`PooledBuffer::mark_used`] is scrubbed
/// on release. A buffer that never reports usage is scrubbed in full.
pub struct PooledBuffer<'a> {
    buf: Option<Box<[u8]>>,
    used: Option<usize>,
    pool: &'a BufferPool,
}

impl PooledBuffer<'_> {
    /// Records that bytes `[..n]` were written.
    pub fn mark_used(&mut self, n: usize) {
        self.used = Some(self.used.map_or(n, |used| used.max(n)));
    }
}

impl Deref for PooledBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buf.as_deref().unwrap_or(&[])
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buf.as_deref_mut().unwrap_or(&mut [])
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.release(buf, self.used);
        }
    }
}
