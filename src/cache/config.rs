//! Configuration for the visual element cache

use crate::cache::types::EvictionPolicy;
use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the visual element cache
///
/// Owned by the cache instance. Callers read a copy with
/// `VisualCache::configuration` and replace it through
/// `VisualCache::update_configuration`; a replacement applies from the next
/// operation on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum total size of cached payloads in bytes
    pub max_size_bytes: u64,

    /// Maximum number of entries in the cache
    pub max_entries: usize,

    /// Lifetime given to entries inserted without an explicit expiry.
    /// Zero means such entries never expire.
    pub default_ttl: Duration,

    /// Random variation applied to the default TTL (0.0 - 1.0)
    pub ttl_jitter: f64,

    /// Interval between background expiry sweeps
    pub cleanup_interval: Duration,

    /// Enable the background expiry sweep
    pub enable_auto_cleanup: bool,

    /// Victim ordering used when the cache is over budget
    pub eviction_policy: EvictionPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            // 1 GiB
            max_size_bytes: 1024 * 1024 * 1024,
            max_entries: 10_000,
            // 7 days
            default_ttl: Duration::from_secs(7 * 24 * 3600),
            ttl_jitter: 0.0,
            // 1 hour
            cleanup_interval: Duration::from_secs(3600),
            enable_auto_cleanup: true,
            eviction_policy: EvictionPolicy::Lru,
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(CacheError::ConfigError(
                "max_entries must be greater than 0".to_string(),
            ));
        }

        if self.max_size_bytes == 0 {
            return Err(CacheError::ConfigError(
                "max_size_bytes must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.ttl_jitter) {
            return Err(CacheError::ConfigError(
                "ttl_jitter must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.cleanup_interval.is_zero() {
            return Err(CacheError::ConfigError(
                "cleanup_interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Default TTL with jitter applied, `None` when entries should not expire
    pub fn ttl_with_jitter(&self) -> Option<Duration> {
        if self.default_ttl.is_zero() {
            return None;
        }

        if self.ttl_jitter == 0.0 {
            return Some(self.default_ttl);
        }

        let base_secs = self.default_ttl.as_secs_f64();
        let jitter_range = base_secs * self.ttl_jitter;
        let jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter_range;
        let final_secs = (base_secs + jitter).max(1.0);

        // Saturate instead of overflowing for TTLs near Duration::MAX
        Some(Duration::try_from_secs_f64(final_secs).unwrap_or(Duration::MAX))
    }

    /// Load configuration from `VISUAL_CACHE_*` environment variables,
    /// falling back to the defaults for anything unset
    pub fn from_env() -> Result<Self> {
        let mut builder = CacheConfig::builder();

        if let Some(v) = env_parse::<u64>("VISUAL_CACHE_MAX_SIZE_BYTES")? {
            builder = builder.max_size_bytes(v);
        }
        if let Some(v) = env_parse::<usize>("VISUAL_CACHE_MAX_ENTRIES")? {
            builder = builder.max_entries(v);
        }
        if let Some(v) = env_parse::<u64>("VISUAL_CACHE_DEFAULT_TTL_SECS")? {
            builder = builder.default_ttl(Duration::from_secs(v));
        }
        if let Some(v) = env_parse::<u64>("VISUAL_CACHE_CLEANUP_INTERVAL_SECS")? {
            builder = builder.cleanup_interval(Duration::from_secs(v));
        }
        if let Some(v) = env_parse::<EvictionPolicy>("VISUAL_CACHE_EVICTION_POLICY")? {
            builder = builder.eviction_policy(v);
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }

    /// Apply a partial update, producing the merged configuration
    pub fn merged(&self, update: &CacheConfigUpdate) -> CacheConfig {
        CacheConfig {
            max_size_bytes: update.max_size_bytes.unwrap_or(self.max_size_bytes),
            max_entries: update.max_entries.unwrap_or(self.max_entries),
            default_ttl: update.default_ttl.unwrap_or(self.default_ttl),
            ttl_jitter: update.ttl_jitter.unwrap_or(self.ttl_jitter),
            cleanup_interval: update.cleanup_interval.unwrap_or(self.cleanup_interval),
            enable_auto_cleanup: update
                .enable_auto_cleanup
                .unwrap_or(self.enable_auto_cleanup),
            eviction_policy: update.eviction_policy.unwrap_or(self.eviction_policy),
        }
    }
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| CacheError::ConfigError(format!("{}: {}", name, e))),
        Err(_) => Ok(None),
    }
}

/// Partial configuration update; `None` fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheConfigUpdate {
    pub max_size_bytes: Option<u64>,
    pub max_entries: Option<usize>,
    pub default_ttl: Option<Duration>,
    pub ttl_jitter: Option<f64>,
    pub cleanup_interval: Option<Duration>,
    pub enable_auto_cleanup: Option<bool>,
    pub eviction_policy: Option<EvictionPolicy>,
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    update: CacheConfigUpdate,
}

impl CacheConfigBuilder {
    /// Set maximum cache size in bytes
    pub fn max_size_bytes(mut self, size: u64) -> Self {
        self.update.max_size_bytes = Some(size);
        self
    }

    /// Set maximum number of cache entries
    pub fn max_entries(mut self, max: usize) -> Self {
        self.update.max_entries = Some(max);
        self
    }

    /// Set default TTL for cache entries
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.update.default_ttl = Some(ttl);
        self
    }

    /// Set TTL jitter factor (0.0 - 1.0)
    pub fn ttl_jitter(mut self, jitter: f64) -> Self {
        self.update.ttl_jitter = Some(jitter);
        self
    }

    /// Set cleanup interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.update.cleanup_interval = Some(interval);
        self
    }

    /// Enable or disable automatic cleanup
    pub fn enable_auto_cleanup(mut self, enable: bool) -> Self {
        self.update.enable_auto_cleanup = Some(enable);
        self
    }

    /// Set the eviction policy
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.update.eviction_policy = Some(policy);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        CacheConfig::default().merged(&self.update)
    }
}

/// Preset configurations for common use cases
impl CacheConfig {
    /// Memory-constrained environments
    pub fn small() -> Self {
        Self {
            max_size_bytes: 64 * 1024 * 1024, // 64 MB
            max_entries: 1_000,
            default_ttl: Duration::from_secs(24 * 3600),
            cleanup_interval: Duration::from_secs(600),
            ..Default::default()
        }
    }

    /// Long-running render farms keeping large style libraries warm
    pub fn large() -> Self {
        Self {
            max_size_bytes: 10 * 1024 * 1024 * 1024, // 10 GB
            max_entries: 1_000_000,
            default_ttl: Duration::from_secs(30 * 24 * 3600),
            eviction_policy: EvictionPolicy::Lfu,
            ..Default::default()
        }
    }

    /// Short-lived previews that should not outlive an editing session
    pub fn ephemeral() -> Self {
        Self {
            max_size_bytes: 16 * 1024 * 1024,
            max_entries: 500,
            default_ttl: Duration::from_secs(900),
            ttl_jitter: 0.1,
            cleanup_interval: Duration::from_secs(60),
            eviction_policy: EvictionPolicy::Ttl,
            ..Default::default()
        }
    }
}
