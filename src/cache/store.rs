//! Main cache store with policy-driven eviction and lazy expiry

use crate::cache::{
    config::{CacheConfig, CacheConfigUpdate},
    entry::{estimate_size, reusability_score, CacheEntry, CacheMetadata, MetadataOverrides},
    eviction::{select_victims, EvictionTarget},
    key::cache_key,
    optimize::{self, OptimizationReport},
    search::{self, CacheQuery, CacheSearchResult},
    stats::{CacheStatistics, StatisticsTracker},
    types::{CacheKey, ElementType, GenerationParameters, VisualArtifact},
};
use crate::clock::{add_duration, Clock, SystemClock};
use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Bounded cache of generated visual elements
///
/// This implementation provides:
/// - Thread-safe async access via a single RwLock; no operation awaits
///   anything else while holding it
/// - Lazy expiry on lookup plus an optional background sweep
/// - Five interchangeable eviction policies with a critical-priority guard
/// - Running statistics and similarity search over the stored entries
pub struct VisualCache {
    state: RwLock<CacheState>,
    clock: Arc<dyn Clock>,
}

/// Internal cache storage
struct CacheState {
    /// Main storage: key -> entry
    entries: HashMap<CacheKey, CacheEntry>,

    stats: StatisticsTracker,

    config: CacheConfig,
}

/// Result of an insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertOutcome {
    pub key: CacheKey,
    pub size_bytes: u64,
    /// Keys removed to make room, in removal order
    pub evicted: Vec<CacheKey>,
    /// The cache still exceeded a limit after eviction; the entry was stored anyway
    pub over_budget: bool,
    /// Copy of the stored entry
    pub entry: CacheEntry,
}

impl fmt::Debug for VisualCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisualCache")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl CacheState {
    fn remove(&mut self, key: &str, evicted: bool) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.stats.record_removal(&entry, evicted);
        Some(entry)
    }

    fn eviction_target(&self, incoming_bytes: u64) -> EvictionTarget {
        EvictionTarget {
            bytes: (self.stats.total_size_bytes() + incoming_bytes)
                .saturating_sub(self.config.max_size_bytes),
            entries: (self.stats.total_entries() + 1).saturating_sub(self.config.max_entries),
        }
    }

    fn needs_eviction(&self, incoming_bytes: u64) -> bool {
        self.stats.total_size_bytes() + incoming_bytes > self.config.max_size_bytes
            || self.stats.total_entries() >= self.config.max_entries
    }

    fn refresh_top_reused(&mut self) {
        self.stats.refresh_top_reused(self.entries.values());
    }
}

impl VisualCache {
    /// Create a new cache with the given configuration
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache reading time from `clock`
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        info!("Initializing visual cache with config: {:?}", config);

        Ok(Self {
            state: RwLock::new(CacheState {
                entries: HashMap::new(),
                stats: StatisticsTracker::new(),
                config,
            }),
            clock,
        })
    }

    /// Look up a previously generated element
    ///
    /// A hit bumps the entry's access bookkeeping and returns a copy. An
    /// expired entry is evicted on the spot and reported as a miss.
    pub async fn lookup(
        &self,
        element_type: &ElementType,
        prompt: &str,
        params: &GenerationParameters,
    ) -> Option<CacheEntry> {
        let key = cache_key(element_type, prompt, params);
        let now = self.clock.now();
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        match state.entries.get_mut(&key) {
            None => {
                debug!("Cache miss: {}", key);
            }
            Some(entry) if entry.is_expired(now) => {
                debug!("Cache entry expired: {}", key);
                state.remove(&key, true);
                state.refresh_top_reused();
            }
            Some(entry) => {
                entry.mark_accessed(now);
                let hit = entry.clone();
                state.stats.record_hit();
                debug!("Cache hit: {} (access_count={})", key, hit.access_count);
                return Some(hit);
            }
        }

        state.stats.record_miss();
        None
    }

    /// Store a generated element, evicting others first if a limit would be exceeded
    pub async fn insert(
        &self,
        element_type: ElementType,
        prompt: &str,
        params: &GenerationParameters,
        payload: VisualArtifact,
        overrides: MetadataOverrides,
    ) -> Result<InsertOutcome> {
        let key = cache_key(&element_type, prompt, params);
        let size_bytes = estimate_size(&payload)?;
        let now = self.clock.now();

        if let Some(expires_at) = overrides.expires_at {
            if expires_at <= now {
                return Err(CacheError::InvalidExpiration { expires_at, now });
            }
        }

        let mut state = self.state.write().await;

        let expires_at = overrides.expires_at.or_else(|| {
            state
                .config
                .ttl_with_jitter()
                .map(|ttl| add_duration(now, ttl))
        });

        if state.remove(&key, false).is_some() {
            debug!("Replacing existing cache entry: {}", key);
        }

        let mut evicted = Vec::new();
        if state.needs_eviction(size_bytes) {
            let target = state.eviction_target(size_bytes);
            let victims: Vec<CacheKey> =
                select_victims(state.entries.values(), state.config.eviction_policy, target)
                    .into_iter()
                    .map(|e| e.key.clone())
                    .collect();

            for victim in victims {
                debug!(
                    "Evicting entry under {} policy: {}",
                    state.config.eviction_policy, victim
                );
                state.remove(&victim, true);
                evicted.push(victim);
            }
        }

        let over_budget = !state.eviction_target(size_bytes).is_empty();
        if over_budget {
            warn!(
                key = %key,
                size_bytes,
                total_size_bytes = state.stats.total_size_bytes(),
                total_entries = state.stats.total_entries(),
                "Cannot evict enough entries, cache budget exceeded"
            );
        }

        let metadata = CacheMetadata {
            tags: overrides.tags,
            project: overrides.project,
            episode: overrides.episode,
            character: overrides.character,
            scene: overrides.scene,
            priority: overrides.priority.unwrap_or_default(),
            expires_at,
            reusability_score: reusability_score(&element_type, &payload),
        };

        let entry = CacheEntry {
            key: key.clone(),
            element_type,
            payload,
            metadata,
            created_at: now,
            last_accessed_at: now,
            access_count: 1,
            size_bytes,
        };

        debug!("Inserting cache entry: {} ({} bytes)", key, size_bytes);
        state.stats.record_insert(&entry);
        state.entries.insert(key.clone(), entry.clone());
        state.refresh_top_reused();

        Ok(InsertOutcome {
            key,
            size_bytes,
            evicted,
            over_budget,
            entry,
        })
    }

    /// Filter and rank live entries against a query
    pub async fn search(&self, query: &CacheQuery) -> CacheSearchResult {
        let now = self.clock.now();
        let state = self.state.read().await;
        search::search(state.entries.values(), query, now)
    }

    /// Remove entries
    ///
    /// Without a query every entry is dropped and statistics are reset. With a
    /// query only entries passing its filters (the similarity threshold is
    /// ignored) are removed, and each counts as an eviction. Returns the
    /// number removed.
    pub async fn clear(&self, query: Option<&CacheQuery>) -> usize {
        let now = self.clock.now();
        let mut state = self.state.write().await;

        let Some(query) = query else {
            let count = state.entries.len();
            state.entries.clear();
            state.stats.reset();
            info!("Cleared {} entries from cache", count);
            return count;
        };

        let keys: Vec<CacheKey> = state
            .entries
            .values()
            .filter(|e| query.matches(e, now))
            .map(|e| e.key.clone())
            .collect();

        for key in &keys {
            state.remove(key, true);
        }
        if !keys.is_empty() {
            state.refresh_top_reused();
        }

        info!("Cleared {} entries matching query", keys.len());
        keys.len()
    }

    /// Remove one entry; returns whether it was present
    pub async fn evict(&self, key: &str) -> bool {
        let mut state = self.state.write().await;
        if state.remove(key, true).is_some() {
            state.refresh_top_reused();
            debug!("Evicted cache entry: {}", key);
            true
        } else {
            false
        }
    }

    /// Remove all expired entries
    pub async fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let mut state = self.state.write().await;

        let expired_keys: Vec<CacheKey> = state
            .entries
            .values()
            .filter(|e| e.is_expired(now))
            .map(|e| e.key.clone())
            .collect();

        for key in &expired_keys {
            state.remove(key, true);
        }
        state.stats.record_cleanup(now);

        if !expired_keys.is_empty() {
            state.refresh_top_reused();
            info!("Cleaned up {} expired entries", expired_keys.len());
        }

        expired_keys.len()
    }

    /// Get cache statistics
    pub async fn statistics(&self) -> CacheStatistics {
        self.state.read().await.stats.snapshot()
    }

    /// Copy of the active configuration
    pub async fn configuration(&self) -> CacheConfig {
        self.state.read().await.config.clone()
    }

    /// Merge a partial update into the configuration
    ///
    /// The merged configuration is validated before it replaces the current
    /// one. Existing entries are untouched; new limits apply from the next
    /// insert.
    pub async fn update_configuration(&self, update: CacheConfigUpdate) -> Result<()> {
        let mut state = self.state.write().await;
        let merged = state.config.merged(&update);
        merged.validate()?;
        info!("Cache configuration updated: {:?}", merged);
        state.config = merged;
        Ok(())
    }

    /// Whether storing `incoming_bytes` more would require eviction
    pub async fn needs_eviction(&self, incoming_bytes: u64) -> bool {
        self.state.read().await.needs_eviction(incoming_bytes)
    }

    /// Check if a key exists in the cache (without updating access time)
    pub async fn contains_key(&self, key: &str) -> bool {
        self.state.read().await.entries.contains_key(key)
    }

    /// Get number of entries in cache
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Check if cache is empty
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    /// Analyse utilisation and recommend clean-up actions
    pub async fn optimize(&self) -> OptimizationReport {
        let now = self.clock.now();
        let state = self.state.read().await;
        optimize::analyze(state.entries.values(), &state.config, now)
    }

    async fn sweep_settings(&self) -> (std::time::Duration, bool) {
        let state = self.state.read().await;
        (state.config.cleanup_interval, state.config.enable_auto_cleanup)
    }
}

/// Spawn the background expiry sweep
///
/// The task re-reads the cleanup interval every cycle so configuration
/// updates apply on the next tick. It exits when `shutdown` flips to `true`,
/// when the sender is dropped, or once the cache itself has been dropped.
pub fn spawn_cleanup_task(
    cache: &Arc<VisualCache>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let cache: Weak<VisualCache> = Arc::downgrade(cache);

    tokio::spawn(async move {
        info!("Starting automatic cache cleanup task");

        loop {
            let (interval, enabled) = match cache.upgrade() {
                Some(cache) => cache.sweep_settings().await,
                None => {
                    debug!("Cache dropped, stopping cleanup task");
                    break;
                }
            };

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Cache cleanup task shutting down");
                        break;
                    }
                    continue;
                }
                _ = tokio::time::sleep(interval) => {}
            }

            if !enabled {
                continue;
            }

            let Some(cache) = cache.upgrade() else {
                debug!("Cache dropped, stopping cleanup task");
                break;
            };
            let removed = cache.cleanup_expired().await;
            if removed > 0 {
                debug!("Auto cleanup removed {} entries", removed);
            }
        }
    })
}
