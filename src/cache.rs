use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::source::Cell;

struct CacheEntry {
    rows: Vec<Vec<Cell>>,
    error: Option<String>,
    expires_at: Instant,
}

/// One live cache entry as seen by the loader. `error` is set when the
/// entry was produced by a failed query; the rows are then empty and
/// the message must stay user-visible for the whole TTL window.
pub struct CacheHit<'a> {
    pub rows: &'a [Vec<Cell>],
    pub error: Option<&'a str>,
}

/// TTL cache for query results, keyed by the exact query text. A hit
/// within the TTL window short-circuits the database entirely; an
/// expired entry is treated as absent and re-fetched by the caller.
pub struct QueryCache {
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, query: &str) -> Option<CacheHit<'_>> {
        let entry = self.entries.get(query)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        debug!(rows = entry.rows.len(), "query cache hit");
        Some(CacheHit {
            rows: &entry.rows,
            error: entry.error.as_deref(),
        })
    }

    pub fn insert(&mut self, query: &str, rows: Vec<Vec<Cell>>) {
        self.entries.insert(
            query.to_string(),
            CacheEntry {
                rows,
                error: None,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Cache a failed execution: empty rows plus the error message, so
    /// the failure is not retried and stays reportable until expiry.
    pub fn insert_failed(&mut self, query: &str, message: String) {
        self.entries.insert(
            query.to_string(),
            CacheEntry {
                rows: Vec::new(),
                error: Some(message),
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
