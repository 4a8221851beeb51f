//! Property tests for key derivation, budget enforcement and backoff bounds

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::time::Duration;
use visual_cache::cache::{
    cache_key, CacheConfig, ElementType, EvictionPolicy, GenerationParameters, MetadataOverrides,
    Priority, VisualArtifact, VisualCache,
};
use visual_cache::resilience::MIN_RETRY_DELAY;
use visual_cache::RetryConfig;

fn element_type_strategy() -> impl Strategy<Value = ElementType> {
    prop_oneof![
        Just(ElementType::CHARACTER_DESIGN),
        Just(ElementType::BACKGROUND_SCENE),
        Just(ElementType::LIGHTING_SETUP),
        Just(ElementType::CAMERA_ANGLE),
        Just(ElementType::COLOR_PALETTE),
        Just(ElementType::STYLE_TEMPLATE),
        Just(ElementType::VISUAL_EFFECT),
        Just(ElementType::TRANSITION_EFFECT),
    ]
}

fn policy_strategy() -> impl Strategy<Value = EvictionPolicy> {
    prop_oneof![
        Just(EvictionPolicy::Lru),
        Just(EvictionPolicy::Lfu),
        Just(EvictionPolicy::Fifo),
        Just(EvictionPolicy::Priority),
        Just(EvictionPolicy::Ttl),
    ]
}

fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High),
        Just(Priority::Critical),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Extras inserted in any order produce the same key.
    #[test]
    fn prop_key_ignores_extras_order(
        element_type in element_type_strategy(),
        prompt in "[a-zA-Z ]{1,40}",
        extras in prop::collection::btree_map("[a-z_]{1,8}", any::<i64>(), 0..6),
    ) {
        let mut forward = GenerationParameters::new("runway", "1280x720");
        for (name, value) in &extras {
            forward = forward.with_param(name.clone(), json!(value));
        }
        let mut reverse = GenerationParameters::new("runway", "1280x720");
        for (name, value) in extras.iter().rev() {
            reverse = reverse.with_param(name.clone(), json!(value));
        }

        prop_assert_eq!(
            cache_key(&element_type, &prompt, &forward),
            cache_key(&element_type, &prompt, &reverse)
        );
    }

    /// Case and surrounding whitespace never change the key.
    #[test]
    fn prop_key_normalizes_prompt(
        element_type in element_type_strategy(),
        prompt in "[a-z][a-z ]{0,30}[a-z]",
        pad in 0usize..4,
    ) {
        let params = GenerationParameters::new("pika", "720p").with_seed(3);
        let padded = format!("{}{}{}", " ".repeat(pad), prompt.to_uppercase(), "\t".repeat(pad));

        let key = cache_key(&element_type, &prompt, &params);
        prop_assert_eq!(&key, &cache_key(&element_type, &padded, &params));
        let prefix = format!("{}_", element_type);
        prop_assert!(key.starts_with(&prefix));
    }

    /// Whatever the policy and priority mix, non-critical inserts never
    /// leave the entry budget exceeded and the statistics stay in step with the store.
    #[test]
    fn prop_entry_budget_holds(
        policy in policy_strategy(),
        max_entries in 1usize..6,
        priorities in prop::collection::vec(priority_strategy(), 1..20),
    ) {
        tokio_test::block_on(async {
            let cache = VisualCache::new(
                CacheConfig::builder()
                    .max_entries(max_entries)
                    .eviction_policy(policy)
                    .build(),
            )
            .unwrap();
            let params = GenerationParameters::new("svd", "512x512");

            for (i, priority) in priorities.iter().enumerate() {
                let prompt = format!("frame {}", i);
                let outcome = cache
                    .insert(
                        ElementType::VISUAL_EFFECT,
                        &prompt,
                        &params,
                        VisualArtifact::new(prompt.as_str(), 0.5, params.clone()),
                        MetadataOverrides::new().priority(*priority),
                    )
                    .await
                    .unwrap();

                let stats = cache.statistics().await;
                assert_eq!(stats.total_entries, cache.len().await);
                if !outcome.over_budget {
                    assert!(stats.total_entries <= max_entries);
                }
            }
        });
    }

    /// Backoff delays stay between the floor and the jittered cap.
    #[test]
    fn prop_delay_within_bounds(
        attempt in 0u32..20,
        base_ms in 1u64..5_000,
        max_ms in 100u64..60_000,
        jitter in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let config = RetryConfig {
            max_retries: 3,
            base_delay: Duration::from_millis(base_ms),
            max_delay: Duration::from_millis(max_ms),
            backoff_multiplier: 2.0,
            jitter,
        };
        let mut rng = StdRng::seed_from_u64(seed);
        let delay = config.delay_for_attempt(attempt, &mut rng);

        prop_assert!(delay >= MIN_RETRY_DELAY);
        let cap = (max_ms as f64 * 1.25).ceil() as u64;
        prop_assert!(delay <= Duration::from_millis(cap.max(MIN_RETRY_DELAY.as_millis() as u64)));
    }
}
