//! Victim selection under the configured eviction policy
//!
//! Every policy is a total order over entries with ties broken by key, so the
//! same cache state always yields the same victims. Critical entries are only
//! taken once every other candidate is used up and the shortfall is still
//! more than half of the target.

use crate::cache::entry::CacheEntry;
use crate::cache::types::EvictionPolicy;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// How much the cache must shed before an insert fits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvictionTarget {
    /// Bytes to free
    pub bytes: u64,
    /// Entries to remove
    pub entries: usize,
}

impl EvictionTarget {
    pub fn is_empty(&self) -> bool {
        self.bytes == 0 && self.entries == 0
    }

    fn is_met(&self, freed_bytes: u64, freed_entries: usize) -> bool {
        freed_bytes >= self.bytes && freed_entries >= self.entries
    }

    /// True while less than half of either dimension has been freed
    fn below_half(&self, freed_bytes: u64, freed_entries: usize) -> bool {
        (self.bytes > 0 && freed_bytes.saturating_mul(2) < self.bytes)
            || (self.entries > 0 && freed_entries.saturating_mul(2) < self.entries)
    }
}

/// Compare two entries under a policy; lower sorts first (evicted first)
pub fn compare(policy: EvictionPolicy, a: &CacheEntry, b: &CacheEntry) -> Ordering {
    let primary = match policy {
        EvictionPolicy::Lru => a.last_accessed_at.cmp(&b.last_accessed_at),
        EvictionPolicy::Lfu => a.access_count.cmp(&b.access_count),
        EvictionPolicy::Fifo => a.created_at.cmp(&b.created_at),
        EvictionPolicy::Priority => a.metadata.priority.rank().cmp(&b.metadata.priority.rank()),
        EvictionPolicy::Ttl => expiry_rank(a).cmp(&expiry_rank(b)),
    };
    primary.then_with(|| a.key.cmp(&b.key))
}

fn expiry_rank(entry: &CacheEntry) -> DateTime<Utc> {
    entry.metadata.expires_at.unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Choose entries to remove, in removal order
///
/// Walks the policy order greedily, skipping critical entries, until the
/// target is met. If non-critical candidates run out first, critical entries
/// are considered in the same order while less than half of the target has
/// been freed. When everything eligible is exhausted the selection is
/// returned as-is; the caller detects the remaining overrun.
pub fn select_victims<'a, I>(
    entries: I,
    policy: EvictionPolicy,
    target: EvictionTarget,
) -> Vec<&'a CacheEntry>
where
    I: IntoIterator<Item = &'a CacheEntry>,
{
    let mut ordered: Vec<&CacheEntry> = entries.into_iter().collect();
    ordered.sort_by(|a, b| compare(policy, a, b));

    let (critical, regular): (Vec<&CacheEntry>, Vec<&CacheEntry>) =
        ordered.into_iter().partition(|e| e.is_critical());

    let mut victims = Vec::new();
    let mut freed_bytes = 0u64;

    for entry in regular {
        if target.is_met(freed_bytes, victims.len()) {
            return victims;
        }
        freed_bytes += entry.size_bytes;
        victims.push(entry);
    }

    for entry in critical {
        if target.is_met(freed_bytes, victims.len())
            || !target.below_half(freed_bytes, victims.len())
        {
            break;
        }
        freed_bytes += entry.size_bytes;
        victims.push(entry);
    }

    victims
}
