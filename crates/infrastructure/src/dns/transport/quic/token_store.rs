//! Address-validation token cache used for 0-RTT reconnection
//! (RFC 9000 section 8.1).
//!
//! One store per upstream; it is swapped for a fresh one whenever the
//! connection is torn down so tokens the server may have invalidated are
//! never presented again.

use bytes::Bytes;
use lru::LruCache;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// One upstream per store.
pub const MAX_ORIGINS: usize = 1;

pub const TOKENS_PER_ORIGIN: usize = 10;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

pub struct TokenStore {
    origins: Mutex<LruCache<String, VecDeque<Bytes>>>,
    tokens_per_origin: usize,
    generation: u64,
}

impl TokenStore {
    pub fn new(max_origins: usize, tokens_per_origin: usize) -> Self {
        let capacity = NonZeroUsize::new(max_origins).unwrap_or(NonZeroUsize::MIN);
        Self {
            origins: Mutex::new(LruCache::new(capacity)),
            tokens_per_origin: tokens_per_origin.max(1),
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Unique, increasing identifier of this store instance.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn insert(&self, server_name: &str, token: Bytes) {
        let mut origins = self.origins.lock().unwrap_or_else(|e| e.into_inner());
        let tokens = origins.get_or_insert_mut(server_name.to_string(), VecDeque::new);
        if tokens.len() == self.tokens_per_origin {
            tokens.pop_front();
        }
        tokens.push_back(token);
    }

    /// Takes the most recently issued token for `server_name`.
    pub fn take(&self, server_name: &str) -> Option<Bytes> {
        let mut origins = self.origins.lock().unwrap_or_else(|e| e.into_inner());
        let tokens = origins.get_mut(server_name)?;
        let token = tokens.pop_back();
        if tokens.is_empty() {
            origins.pop(server_name);
        }
        token
    }

    pub fn len(&self) -> usize {
        let origins = self.origins.lock().unwrap_or_else(|e| e.into_inner());
        origins.iter().map(|(_, tokens)| tokens.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(MAX_ORIGINS, TOKENS_PER_ORIGIN)
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("generation", &self.generation)
            .field("tokens", &self.len())
            .finish()
    }
}
