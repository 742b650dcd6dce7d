//! Response cache write-through.
//!
//! Chromium mapping: net/http/http_cache.h (simplified in-memory version)
//!
//! Body readers mirror every byte they hand out into a [`CacheSink`]. The sink
//! is committed with [`CacheSink::close`] once the body is complete and thrown
//! away with [`CacheSink::abort`] if the body is cut short.
//! [`HttpCache`] is a thread-safe in-memory store producing such sinks.

use crate::http::headers::Headers;
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use std::io;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Destination for a response body being cached.
pub trait CacheSink: Send {
    /// Append body bytes, in the order they were read.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Commit the entry. Called once the body boundary was reached.
    fn close(self: Box<Self>) -> io::Result<()>;

    /// Discard the entry. Called when the body ended early.
    fn abort(self: Box<Self>);
}

/// Cache key components.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    /// URL without fragment
    url: String,
    /// HTTP method (only GET/HEAD are cacheable)
    method: String,
}

impl CacheKey {
    pub fn new(url: &Url, method: &str) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            url: url.into(),
            method: method.to_uppercase(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &str {
        &self.method
    }
}

/// Cached response entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Response status code
    pub status: u16,
    /// Response headers
    pub headers: Headers,
    /// Response body
    pub body: Bytes,
    /// When this entry was committed
    pub cached_at: Instant,
    sequence: u64,
}

/// In-memory HTTP cache.
///
/// Thread-safe implementation using DashMap for concurrent access.
/// Enforces entry and body-size limits; the oldest entry goes first.
#[derive(Debug)]
pub struct HttpCache {
    entries: DashMap<CacheKey, CacheEntry>,
    max_entries: usize,
    max_body_bytes: usize,
    commits: AtomicUsize,
    aborts: AtomicUsize,
    next_sequence: AtomicU64,
}

impl Default for HttpCache {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpCache {
    /// Create a new cache with default limits.
    pub fn new() -> Self {
        Self::with_limits(1000, 10 * 1024 * 1024) // 10MB per body
    }

    /// Create a cache with custom limits.
    pub fn with_limits(max_entries: usize, max_body_bytes: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
            max_body_bytes,
            commits: AtomicUsize::new(0),
            aborts: AtomicUsize::new(0),
            next_sequence: AtomicU64::new(0),
        }
    }

    /// Begin writing an entry for `key`. Nothing is visible until the
    /// returned sink is closed.
    pub fn writer(self: &Arc<Self>, key: CacheKey, status: u16, headers: Headers) -> Box<dyn CacheSink> {
        Box::new(CacheEntryWriter {
            cache: Arc::clone(self),
            key,
            status,
            headers,
            body: BytesMut::new(),
            oversized: false,
        })
    }

    /// Look up a committed entry.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.get(key).map(|e| e.clone())
    }

    pub fn remove(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.remove(key).map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of entries committed through sinks.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::Relaxed)
    }

    /// Number of sinks aborted.
    pub fn abort_count(&self) -> usize {
        self.aborts.load(Ordering::Relaxed)
    }

    fn insert(&self, key: CacheKey, entry: CacheEntry) {
        self.entries.insert(key, entry);
        while self.entries.len() > self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|e| e.sequence)
                .map(|e| e.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
        self.commits.fetch_add(1, Ordering::Relaxed);
    }
}

/// Sink that accumulates a body and commits it into an [`HttpCache`].
struct CacheEntryWriter {
    cache: Arc<HttpCache>,
    key: CacheKey,
    status: u16,
    headers: Headers,
    body: BytesMut,
    oversized: bool,
}

impl CacheSink for CacheEntryWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if self.oversized {
            return Ok(());
        }
        if self.body.len() + data.len() > self.cache.max_body_bytes {
            self.oversized = true;
            self.body = BytesMut::new();
            return Ok(());
        }
        self.body.extend_from_slice(data);
        Ok(())
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        let writer = *self;
        if writer.oversized {
            tracing::debug!(url = %writer.key.url(), "response too big to cache");
            writer.cache.aborts.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }
        let entry = CacheEntry {
            status: writer.status,
            headers: writer.headers,
            body: writer.body.freeze(),
            cached_at: Instant::now(),
            sequence: writer.cache.next_sequence.fetch_add(1, Ordering::Relaxed),
        };
        writer.cache.insert(writer.key, entry);
        Ok(())
    }

    fn abort(self: Box<Self>) {
        tracing::debug!(url = %self.key.url(), "cache entry aborted");
        self.cache.aborts.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(path: &str) -> CacheKey {
        CacheKey::new(&Url::parse(&format!("https://example.com{}", path)).unwrap(), "get")
    }

    #[test]
    fn test_key_strips_fragment() {
        let a = CacheKey::new(&Url::parse("https://example.com/a#x").unwrap(), "GET");
        let b = CacheKey::new(&Url::parse("https://example.com/a").unwrap(), "get");
        assert_eq!(a, b);
        assert_eq!(a.method(), "GET");
    }

    #[test]
    fn test_commit_makes_entry_visible() {
        let cache = Arc::new(HttpCache::new());
        let mut sink = cache.writer(key("/a"), 200, Headers::new());
        sink.write(b"hello ").unwrap();
        assert!(cache.get(&key("/a")).is_none());
        sink.write(b"world").unwrap();
        sink.close().unwrap();

        let entry = cache.get(&key("/a")).unwrap();
        assert_eq!(entry.status, 200);
        assert_eq!(&entry.body[..], b"hello world");
        assert_eq!(cache.commit_count(), 1);
    }

    #[test]
    fn test_abort_discards_entry() {
        let cache = Arc::new(HttpCache::new());
        let mut sink = cache.writer(key("/a"), 200, Headers::new());
        sink.write(b"partial").unwrap();
        sink.abort();
        assert!(cache.is_empty());
        assert_eq!(cache.abort_count(), 1);
    }

    #[test]
    fn test_oversized_body_not_cached() {
        let cache = Arc::new(HttpCache::with_limits(10, 4));
        let mut sink = cache.writer(key("/big"), 200, Headers::new());
        sink.write(b"12345").unwrap();
        sink.close().unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_entry_limit_evicts_oldest() {
        let cache = Arc::new(HttpCache::with_limits(2, 1024));
        for path in ["/1", "/2", "/3"] {
            let sink = cache.writer(key(path), 200, Headers::new());
            sink.close().unwrap();
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("/1")).is_none());
        assert!(cache.get(&key("/3")).is_some());
    }
}
