//! # Visual Element Cache
//!
//! A bounded cache for expensive generated artifacts (character designs,
//! background scenes, lighting setups, ...), keyed by the inputs that
//! produced them.
//!
//! ## Features
//!
//! - **Deterministic Keys**: `{element_type}_{sha256 prefix}` over the normalized
//!   prompt and canonicalised generation parameters
//! - **TTL-Based Expiration**: lazy expiry on lookup plus an optional background sweep
//! - **Five Eviction Policies**: LRU, LFU, FIFO, priority and TTL order, with
//!   critical entries evicted only as a last resort
//! - **Similarity Search**: hard filters plus weighted similarity ranking
//! - **Statistics**: cumulative hit/miss rates, per-type aggregates and the
//!   most reused entries
//!
//! ## Example
//!
//! ```rust
//! use visual_cache::cache::{
//!     CacheConfig, ElementType, GenerationParameters, MetadataOverrides, VisualArtifact,
//!     VisualCache,
//! };
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = CacheConfig::builder()
//!     .default_ttl(Duration::from_secs(3600)) // 1 hour
//!     .max_entries(10_000)
//!     .max_size_bytes(100 * 1024 * 1024) // 100 MB
//!     .build();
//!
//! let cache = VisualCache::new(config)?;
//! let params = GenerationParameters::new("runway", "1280x720");
//!
//! let artifact = VisualArtifact::new("Alice in forest", 0.9, params.clone())
//!     .with_url("https://cdn.example/alice.mp4");
//! cache
//!     .insert(
//!         ElementType::CHARACTER_DESIGN,
//!         "Alice in forest",
//!         &params,
//!         artifact,
//!         MetadataOverrides::new().character("alice"),
//!     )
//!     .await?;
//!
//! if let Some(entry) = cache
//!     .lookup(&ElementType::CHARACTER_DESIGN, "Alice in forest", &params)
//!     .await
//! {
//!     println!("Cache hit: {:?}", entry.payload.generated_url);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod eviction;
pub mod key;
pub mod optimize;
pub mod search;
pub mod stats;
pub mod store;
pub mod types;

pub use config::{CacheConfig, CacheConfigBuilder, CacheConfigUpdate};
pub use entry::{CacheEntry, CacheMetadata, MetadataOverrides};
pub use eviction::{select_victims, EvictionTarget};
pub use key::cache_key;
pub use optimize::{OptimizationAction, OptimizationReport};
pub use search::{CacheQuery, CacheSearchResult, SimilarMatch};
pub use stats::{CacheStatistics, ReusedElement};
pub use store::{spawn_cleanup_task, InsertOutcome, VisualCache};
pub use types::{
    CacheKey, ElementType, EvictionPolicy, GenerationParameters, Priority, Variation,
    VisualArtifact,
};
