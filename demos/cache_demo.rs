//! Visual Cache Demo Application
//!
//! Walks through inserting, reusing, searching and evicting generated
//! elements, then prints statistics and an optimization report.
//!
//! Usage:
//!   cargo run --example cache_demo
//!
//! Environment variables (all optional, read from `.env` too):
//!   VISUAL_CACHE_MAX_ENTRIES         - entry budget
//!   VISUAL_CACHE_MAX_SIZE_BYTES      - size budget
//!   VISUAL_CACHE_DEFAULT_TTL_SECS    - default time-to-live
//!   VISUAL_CACHE_EVICTION_POLICY     - lru | lfu | fifo | priority | ttl
//!   RUST_LOG                         - log filter (default: info)

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;
use visual_cache::{
    spawn_cleanup_task, CacheConfig, CacheQuery, ElementType, GenerationParameters,
    MetadataOverrides, Priority, VisualArtifact, VisualCache,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("=== Visual Cache Demo ===");

    let config = CacheConfig::from_env()?;
    info!(
        "Budget: {} entries, {} bytes, {} eviction",
        config.max_entries, config.max_size_bytes, config.eviction_policy
    );
    let cache = Arc::new(VisualCache::new(config)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = spawn_cleanup_task(&cache, shutdown_rx);

    let params = GenerationParameters::new("runway", "1280x720").with_seed(42);

    info!("\n--- Populating cache ---");
    let elements = [
        (ElementType::CHARACTER_DESIGN, "Alice in forest", "alice", Priority::Critical),
        (ElementType::CHARACTER_DESIGN, "Bob in city", "bob", Priority::High),
        (ElementType::BACKGROUND_SCENE, "Misty forest clearing", "alice", Priority::Medium),
        (ElementType::LIGHTING_SETUP, "Golden hour rim light", "bob", Priority::Low),
    ];
    for (element_type, prompt, character, priority) in elements {
        let artifact = VisualArtifact::new(prompt, 0.85, params.clone())
            .with_url(format!("https://cdn.example/{}.png", prompt.replace(' ', "_")));
        let outcome = cache
            .insert(
                element_type,
                prompt,
                &params,
                artifact,
                MetadataOverrides::new()
                    .project("novel-1")
                    .episode("ep01")
                    .character(character)
                    .priority(priority),
            )
            .await?;
        info!("Stored {} ({} bytes)", outcome.key, outcome.size_bytes);
    }

    info!("\n--- Lookups ---");
    for prompt in ["Alice in forest", "  ALICE IN FOREST ", "Carol at sea"] {
        match cache
            .lookup(&ElementType::CHARACTER_DESIGN, prompt, &params)
            .await
        {
            Some(entry) => info!(
                "✓ Hit for {:?}: {} (access_count={})",
                prompt, entry.key, entry.access_count
            ),
            None => info!("✗ Miss for {:?}", prompt),
        }
    }

    info!("\n--- Search ---");
    let result = cache
        .search(
            &CacheQuery::new()
                .project("novel-1")
                .character("alice")
                .similarity_threshold(0.1),
        )
        .await;
    info!(
        "Found {} entries ({} exact, {} similar)",
        result.total_found,
        result.exact_matches.len(),
        result.similar_matches.len()
    );
    for entry in &result.matches {
        info!("  {} [{}]", entry.key, entry.element_type);
    }

    info!("\n--- Statistics ---");
    info!("{}", cache.statistics().await);

    info!("\n--- Optimization Report ---");
    let report = cache.optimize().await;
    info!(
        "Utilization: {:.4}%, fragmentation: {:.2}",
        report.utilization_rate * 100.0,
        report.fragmentation_level
    );
    for action in &report.recommended_actions {
        info!(
            "  {:?} ({:?}): {} saves ~{} bytes",
            action.kind, action.priority, action.description, action.estimated_savings
        );
    }
    info!("{}", serde_json::to_string_pretty(&report)?);

    let removed = cache.clear(None).await;
    info!("\nCleared {} entries", removed);

    shutdown_tx.send(true)?;
    sweeper.await?;
    info!("=== Demo Complete ===");
    Ok(())
}
