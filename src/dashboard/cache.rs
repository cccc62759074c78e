//! A time-bounded cache of the full record list.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crate::{Error, record::Record};

/// Holds the records from the last successful load and when they were fetched.
///
/// The cache is invalidated purely by time: once more than `ttl` has passed
/// since the fetch, the next read loads the records again.
#[derive(Debug)]
pub struct RecordCache {
    ttl: Duration,
    entry: Option<CacheEntry>,
}

#[derive(Debug)]
struct CacheEntry {
    fetched_at: Instant,
    records: Arc<Vec<Record>>,
}

impl RecordCache {
    /// The default time to keep records before loading them again.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

    /// Create an empty cache that keeps records for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    /// Whether the cached records are missing or older than the TTL at `now`.
    pub fn is_stale(&self, now: Instant) -> bool {
        match self.entry {
            Some(ref entry) => now.saturating_duration_since(entry.fetched_at) > self.ttl,
            None => true,
        }
    }

    /// Get the cached records, calling `load` first if they are stale at `now`.
    ///
    /// # Errors
    /// Returns the error from `load`. Failed loads are not cached, so the
    /// next call tries again.
    pub fn get_or_load(
        &mut self,
        now: Instant,
        load: impl FnOnce() -> Result<Vec<Record>, Error>,
    ) -> Result<Arc<Vec<Record>>, Error> {
        if !self.is_stale(now) {
            if let Some(ref entry) = self.entry {
                return Ok(entry.records.clone());
            }
        }

        let records = Arc::new(load()?);
        tracing::debug!("Loaded {} records into the dashboard cache", records.len());

        self.entry = Some(CacheEntry {
            fetched_at: now,
            records: records.clone(),
        });

        Ok(records)
    }
}

impl Default for RecordCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}
