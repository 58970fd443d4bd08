//! Versioned constraint-result cache.
//!
//! Entries are keyed by the candidate's request, time window and resource
//! set. Each entry records the state version it was computed against and
//! an expiry instant; it is served only while both still hold.

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::constraints::Violation;
use crate::models::Assignment;

/// Cache key: what a constraint check depends on besides the solution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CheckKey {
    pub request_id: String,
    pub occurrence_index: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub resources: BTreeSet<String>,
}

impl CheckKey {
    pub fn of(assignment: &Assignment) -> Self {
        Self {
            request_id: assignment.request_id.clone(),
            occurrence_index: assignment.occurrence_index,
            start: assignment.start_time,
            end: assignment.end_time,
            resources: assignment.resource_ids().map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    result: Option<Violation>,
    version: u64,
    valid_until: Instant,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Constraint results valid for one state version and a TTL.
#[derive(Debug, Clone)]
pub struct CheckCache {
    ttl: Duration,
    entries: HashMap<CheckKey, Entry>,
    stats: CacheStats,
}

impl CheckCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// Cached result for `key` at `version`, if still fresh.
    ///
    /// The outer `Option` is the cache lookup; the inner one is the
    /// constraint outcome.
    pub fn get(&mut self, key: &CheckKey, version: u64, now: Instant) -> Option<Option<Violation>> {
        match self.entries.get(key) {
            Some(e) if e.version == version && now < e.valid_until => {
                self.stats.hits += 1;
                Some(e.result.clone())
            }
            _ => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: CheckKey, result: Option<Violation>, version: u64, now: Instant) {
        self.entries.insert(
            key,
            Entry {
                result,
                version,
                valid_until: now + self.ttl,
            },
        );
    }

    /// Drops entries computed against another version or already expired.
    pub fn purge(&mut self, version: u64, now: Instant) {
        self.entries.retain(|_, e| e.version == version && now < e.valid_until);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
