//! Retry Demo Application
//!
//! Runs a flaky simulated generator through the retry controller, shows a
//! non-recoverable failure and prints the resulting error statistics.
//!
//! Usage:
//!   cargo run --example retry_demo
//!
//! Environment variables:
//!   RUST_LOG - log filter (default: info)

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use visual_cache::{
    CacheConfig, CachedGenerator, ElementType, ErrorClassifier, GenerationParameters,
    MetadataOverrides, RetryConfig, RetryContext, RetryController, VisualArtifact, VisualCache,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("=== Retry Demo ===");

    let classifier = ErrorClassifier::default();
    info!("\n--- Classification ---");
    for message in [
        "Connection timeout while uploading frames",
        "Rate limit exceeded",
        "401 Unauthorized",
        "Out of memory during upscale",
    ] {
        let report = classifier.classify(message, &RetryContext::new("classify").with_service("runway"));
        info!(
            "{:?} -> {} / {:?}, retry={}, recovery={:?}",
            message,
            report.classification.category,
            report.classification.severity,
            report.classification.retry_recommended,
            report.classification.estimated_recovery
        );
        for suggestion in &report.suggestions {
            info!("    - {}", suggestion);
        }
    }

    let cache = Arc::new(VisualCache::new(CacheConfig::default())?);
    let generator = CachedGenerator::new(cache, RetryController::new(classifier))
        .with_retry_config(RetryConfig {
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            ..RetryConfig::default()
        });
    let params = GenerationParameters::new("pika", "1024x576");

    info!("\n--- Flaky generator ---");
    let calls = Arc::new(AtomicU32::new(0));
    for round in 0..2 {
        let counter = calls.clone();
        let producer_params = params.clone();
        let mut ctx = RetryContext::new("background_scene")
            .with_service("pika")
            .with_storyboard("sb-001");
        let (entry, source) = generator
            .get_or_generate(
                ElementType::BACKGROUND_SCENE,
                "Moonlit harbor",
                &params,
                MetadataOverrides::new().episode("ep01"),
                move || {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    let params = producer_params.clone();
                    async move {
                        if n < 2 {
                            Err(format!("Network timeout on attempt {}", n + 1))
                        } else {
                            Ok(VisualArtifact::new("Moonlit harbor", 0.8, params)
                                .with_url("https://cdn.example/harbor.mp4"))
                        }
                    }
                },
                &mut ctx,
            )
            .await?;
        info!(
            "Round {}: {} from {:?} after delays {:?}",
            round + 1,
            entry.key,
            source,
            ctx.delays
        );
    }
    info!("Generator invoked {} times", calls.load(Ordering::SeqCst));

    info!("\n--- Non-recoverable failure ---");
    let mut ctx = RetryContext::new("character_design").with_service("dalle");
    let result = generator
        .get_or_generate(
            ElementType::CHARACTER_DESIGN,
            "Captain portrait",
            &params,
            MetadataOverrides::new(),
            || async { Err::<VisualArtifact, _>("Invalid API key supplied") },
            &mut ctx,
        )
        .await;
    if let Err(e) = result {
        info!("✗ {}", e);
    }

    info!("\n--- Error Statistics ---");
    let stats = generator.retry_controller().error_statistics().await;
    info!("{}", serde_json::to_string_pretty(&stats)?);

    info!("=== Demo Complete ===");
    Ok(())
}
