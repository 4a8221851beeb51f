//! Hit/miss accounting, per-type aggregates and the most reused entries

use crate::cache::entry::CacheEntry;
use crate::cache::types::{CacheKey, ElementType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Length of the most-reused list
pub const TOP_REUSED_LEN: usize = 10;

/// Summary of one frequently accessed entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReusedElement {
    pub key: CacheKey,
    pub element_type: ElementType,
    pub access_count: u64,
    pub last_accessed_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Point-in-time statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStatistics {
    pub total_entries: usize,
    pub total_size_bytes: u64,
    pub hits: u64,
    pub misses: u64,
    /// Share of lookups since the last reset that hit, in [0, 1]
    pub hit_rate: f64,
    /// Share of lookups since the last reset that missed, in [0, 1]
    pub miss_rate: f64,
    pub eviction_count: u64,
    pub last_cleanup: Option<DateTime<Utc>>,
    pub entries_by_type: BTreeMap<ElementType, usize>,
    pub size_by_type: BTreeMap<ElementType, u64>,
    pub top_reused: Vec<ReusedElement>,
}

impl fmt::Display for CacheStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStatistics {{ hits: {}, misses: {}, hit_rate: {:.2}%, entries: {}, size: {} bytes, evictions: {} }}",
            self.hits,
            self.misses,
            self.hit_rate * 100.0,
            self.total_entries,
            self.total_size_bytes,
            self.eviction_count
        )
    }
}

/// Running statistics owned by the cache state
///
/// Rates are all-time ratios since the last reset, not a trailing window.
#[derive(Debug, Default)]
pub struct StatisticsTracker {
    hits: u64,
    misses: u64,
    total_entries: usize,
    total_size_bytes: u64,
    eviction_count: u64,
    last_cleanup: Option<DateTime<Utc>>,
    entries_by_type: BTreeMap<ElementType, usize>,
    size_by_type: BTreeMap<ElementType, u64>,
    top_reused: Vec<ReusedElement>,
}

impl StatisticsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn miss_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.misses as f64 / total as f64
        }
    }

    pub fn total_entries(&self) -> usize {
        self.total_entries
    }

    pub fn total_size_bytes(&self) -> u64 {
        self.total_size_bytes
    }

    pub fn eviction_count(&self) -> u64 {
        self.eviction_count
    }

    /// Account for a newly stored entry
    pub fn record_insert(&mut self, entry: &CacheEntry) {
        self.total_entries += 1;
        self.total_size_bytes += entry.size_bytes;
        *self
            .entries_by_type
            .entry(entry.element_type.clone())
            .or_insert(0) += 1;
        *self
            .size_by_type
            .entry(entry.element_type.clone())
            .or_insert(0) += entry.size_bytes;
    }

    /// Account for a removed entry; `evicted` bumps the eviction counter
    ///
    /// Totals are clamped at zero. An underflow means the bookkeeping drifted
    /// and is logged rather than propagated.
    pub fn record_removal(&mut self, entry: &CacheEntry, evicted: bool) {
        if self.total_entries == 0 || self.total_size_bytes < entry.size_bytes {
            warn!(
                key = %entry.key,
                total_entries = self.total_entries,
                total_size_bytes = self.total_size_bytes,
                entry_size = entry.size_bytes,
                "Cache size accounting underflow"
            );
        }
        self.total_entries = self.total_entries.saturating_sub(1);
        self.total_size_bytes = self.total_size_bytes.saturating_sub(entry.size_bytes);

        if let Some(count) = self.entries_by_type.get_mut(&entry.element_type) {
            *count = count.saturating_sub(1);
        }
        if let Some(size) = self.size_by_type.get_mut(&entry.element_type) {
            *size = size.saturating_sub(entry.size_bytes);
        }

        if evicted {
            self.eviction_count += 1;
        }
    }

    pub fn record_cleanup(&mut self, at: DateTime<Utc>) {
        self.last_cleanup = Some(at);
    }

    /// Rebuild the most-reused list from the current entries
    pub fn refresh_top_reused<'a, I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = &'a CacheEntry>,
    {
        let mut top: Vec<ReusedElement> = entries
            .into_iter()
            .map(|e| ReusedElement {
                key: e.key.clone(),
                element_type: e.element_type.clone(),
                access_count: e.access_count,
                last_accessed_at: e.last_accessed_at,
                size_bytes: e.size_bytes,
            })
            .collect();
        top.sort_by(|a, b| {
            b.access_count
                .cmp(&a.access_count)
                .then_with(|| a.key.cmp(&b.key))
        });
        top.truncate(TOP_REUSED_LEN);
        self.top_reused = top;
    }

    /// Zero every counter and aggregate
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn snapshot(&self) -> CacheStatistics {
        CacheStatistics {
            total_entries: self.total_entries,
            total_size_bytes: self.total_size_bytes,
            hits: self.hits,
            misses: self.misses,
            hit_rate: self.hit_rate(),
            miss_rate: self.miss_rate(),
            eviction_count: self.eviction_count,
            last_cleanup: self.last_cleanup,
            entries_by_type: self
                .entries_by_type
                .iter()
                .filter(|(_, count)| **count > 0)
                .map(|(t, c)| (t.clone(), *c))
                .collect(),
            size_by_type: self
                .size_by_type
                .iter()
                .filter(|(t, _)| self.entries_by_type.get(*t).copied().unwrap_or(0) > 0)
                .map(|(t, s)| (t.clone(), *s))
                .collect(),
            top_reused: self.top_reused.clone(),
        }
    }
}
