//! # Visual Cache (visual-cache)
//!
//! A bounded cache for expensive generated visual artifacts, paired with a
//! resilience layer that classifies and retries failed generation calls.
//!
//! ## Features
//!
//! - Deterministic content-addressed keys over prompt and generation parameters
//! - Size and entry-count budgets with LRU, LFU, FIFO, priority and TTL eviction
//! - Lazy expiry plus a cancellable background sweep
//! - Filter and similarity search over cached elements
//! - Cumulative hit/miss statistics and per-type aggregates
//! - Keyword-based failure classification with remediation suggestions
//! - Exponential backoff with jitter, bounded retries and cancellation
//! - Async-first design using tokio
//!
//! ## Caching
//!
//! ```no_run
//! use visual_cache::{
//!     CacheConfig, ElementType, GenerationParameters, MetadataOverrides, VisualArtifact,
//!     VisualCache,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = VisualCache::new(CacheConfig::from_env()?)?;
//!     let params = GenerationParameters::new("runway", "1280x720").with_seed(42);
//!
//!     let artifact = VisualArtifact::new("Alice in forest", 0.9, params.clone())
//!         .with_url("https://cdn.example/alice.mp4");
//!     cache
//!         .insert(
//!             ElementType::CHARACTER_DESIGN,
//!             "Alice in forest",
//!             &params,
//!             artifact,
//!             MetadataOverrides::new().project("novel-1").character("alice"),
//!         )
//!         .await?;
//!
//!     let hit = cache
//!         .lookup(&ElementType::CHARACTER_DESIGN, "Alice in forest", &params)
//!         .await;
//!     println!("Cache hit: {}", hit.is_some());
//!     println!("{}", cache.statistics().await);
//!     Ok(())
//! }
//! ```
//!
//! ## Background Cleanup
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio::sync::watch;
//! use visual_cache::{spawn_cleanup_task, CacheConfig, VisualCache};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = Arc::new(VisualCache::new(CacheConfig::default())?);
//!     let (shutdown_tx, shutdown_rx) = watch::channel(false);
//!     let handle = spawn_cleanup_task(&cache, shutdown_rx);
//!
//!     // ... serve requests ...
//!
//!     let _ = shutdown_tx.send(true);
//!     handle.await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Cache or Generate with Retry
//!
//! ```no_run
//! use std::sync::Arc;
//! use visual_cache::{
//!     CacheConfig, CachedGenerator, ElementType, GenerationParameters, MetadataOverrides,
//!     RetryContext, RetryController, VisualArtifact, VisualCache,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = Arc::new(VisualCache::new(CacheConfig::default())?);
//!     let generator = CachedGenerator::new(cache, RetryController::default());
//!     let params = GenerationParameters::new("pika", "1024x576");
//!
//!     let mut context = RetryContext::new("background_scene").with_service("pika");
//!     let (entry, source) = generator
//!         .get_or_generate(
//!             ElementType::BACKGROUND_SCENE,
//!             "Moonlit harbor",
//!             &params,
//!             MetadataOverrides::new().episode("ep01"),
//!             || async {
//!                 Ok::<_, String>(
//!                     VisualArtifact::new("Moonlit harbor", 0.8, GenerationParameters::new("pika", "1024x576"))
//!                         .with_url("https://cdn.example/harbor.mp4"),
//!                 )
//!             },
//!             &mut context,
//!         )
//!         .await?;
//!     println!("{} from {:?}", entry.key, source);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod clock;
pub mod error;
pub mod pipeline;
pub mod resilience;

// Re-export main types for convenience
pub use cache::{
    cache_key, spawn_cleanup_task, CacheConfig, CacheConfigBuilder, CacheConfigUpdate, CacheEntry,
    CacheKey, CacheMetadata, CacheQuery, CacheSearchResult, CacheStatistics, ElementType,
    EvictionPolicy, GenerationParameters, InsertOutcome, MetadataOverrides, OptimizationReport,
    Priority, VisualArtifact, VisualCache,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CacheError, Result};
pub use pipeline::{CachedGenerator, EntrySource};
pub use resilience::{
    ErrorCategory, ErrorClassifier, ErrorReport, ErrorStatistics, RetryConfig, RetryContext,
    RetryController, RetryError, Severity,
};
