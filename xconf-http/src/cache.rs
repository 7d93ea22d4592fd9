//! In-memory response cache used in front of the network for GET requests.
//!
//! Successful response bodies are stored by absolute URL (query string
//! included) with a fixed TTL. Backed by [`moka`], so concurrent lookups from
//! many fetch tasks need no extra locking.

use std::time::Duration;

use bytes::Bytes;
use moka::future::Cache;

#[derive(Clone)]
pub struct ResponseCache {
    inner: Cache<String, Bytes>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { inner }
    }

    pub async fn get(&self, url: &str) -> Option<Bytes> {
        self.inner.get(url).await
    }

    pub async fn insert(&self, url: String, body: Bytes) {
        self.inner.insert(url, body).await;
    }

    /// Approximate number of live entries.
    pub async fn len(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}
