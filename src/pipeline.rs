//! Cache-or-generate: reuse a stored element or produce it under the retry policy

use crate::cache::{
    CacheEntry, ElementType, GenerationParameters, MetadataOverrides, VisualArtifact, VisualCache,
};
use crate::error::Result;
use crate::resilience::{RetryConfig, RetryContext, RetryController};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

/// Where an element returned by [`CachedGenerator::get_or_generate`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    Cache,
    Generated,
}

/// A cache paired with the retry controller guarding its producer
#[derive(Debug)]
pub struct CachedGenerator {
    cache: Arc<VisualCache>,
    retry: RetryController,
    retry_config: RetryConfig,
}

impl CachedGenerator {
    pub fn new(cache: Arc<VisualCache>, retry: RetryController) -> Self {
        Self {
            cache,
            retry,
            retry_config: RetryConfig::default(),
        }
    }

    /// Override the retry schedule used for the producer
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    pub fn cache(&self) -> &Arc<VisualCache> {
        &self.cache
    }

    pub fn retry_controller(&self) -> &RetryController {
        &self.retry
    }

    /// Return the cached element for these inputs, generating and storing it on a miss
    ///
    /// Terminal producer failures and cancellation surface as
    /// [`CacheError::Retry`](crate::error::CacheError::Retry) carrying the full
    /// error report.
    pub async fn get_or_generate<E, F, Fut>(
        &self,
        element_type: ElementType,
        prompt: &str,
        params: &GenerationParameters,
        metadata: MetadataOverrides,
        producer: F,
        context: &mut RetryContext,
    ) -> Result<(CacheEntry, EntrySource)>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<VisualArtifact, E>>,
        E: fmt::Display,
    {
        if let Some(entry) = self.cache.lookup(&element_type, prompt, params).await {
            debug!("Reusing cached {} element: {}", element_type, entry.key);
            return Ok((entry, EntrySource::Cache));
        }

        let payload = self
            .retry
            .run(producer, context, &self.retry_config)
            .await?;

        let outcome = self
            .cache
            .insert(element_type.clone(), prompt, params, payload, metadata)
            .await?;
        info!(
            "Generated and cached {} element: {} ({} bytes, {} evicted)",
            element_type,
            outcome.key,
            outcome.size_bytes,
            outcome.evicted.len()
        );

        Ok((outcome.entry, EntrySource::Generated))
    }
}
