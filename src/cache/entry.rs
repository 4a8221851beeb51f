//! Cache entry management with TTL support

use crate::cache::types::{CacheKey, ElementType, Priority, VisualArtifact};
use crate::clock::elapsed_between;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// A cached visual element with access bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cache key
    pub key: CacheKey,

    /// Kind of element stored
    pub element_type: ElementType,

    /// The cached artifact
    pub payload: VisualArtifact,

    /// Entry metadata
    pub metadata: CacheMetadata,

    /// When the entry was inserted
    pub created_at: DateTime<Utc>,

    /// Last successful lookup (or insertion)
    pub last_accessed_at: DateTime<Utc>,

    /// Insertion counts as the first access
    pub access_count: u64,

    /// Encoded payload size, fixed at insertion
    pub size_bytes: u64,
}

impl CacheEntry {
    /// Check if the entry has expired at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.metadata
            .expires_at
            .map(|expires_at| now >= expires_at)
            .unwrap_or(false)
    }

    /// Get time until expiration, `None` if expired or never expiring
    pub fn time_until_expiration(&self, now: DateTime<Utc>) -> Option<Duration> {
        let expires_at = self.metadata.expires_at?;
        if now >= expires_at {
            None
        } else {
            Some(elapsed_between(now, expires_at))
        }
    }

    /// Mark the entry as accessed (updates access time and count)
    pub fn mark_accessed(&mut self, now: DateTime<Utc>) {
        self.last_accessed_at = now;
        self.access_count += 1;
    }

    /// Get the age of the entry
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        elapsed_between(self.created_at, now)
    }

    /// Check if entry has a specific tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.metadata.tags.contains(tag)
    }

    pub fn is_critical(&self) -> bool {
        self.metadata.priority == Priority::Critical
    }
}

/// Metadata associated with a cache entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// Tags for categorization and selective clearing
    pub tags: BTreeSet<String>,

    /// Correlation ids within the production
    pub project: Option<String>,
    pub episode: Option<String>,
    pub character: Option<String>,
    pub scene: Option<String>,

    /// Retention priority
    pub priority: Priority,

    /// When the entry expires; `None` never expires
    pub expires_at: Option<DateTime<Utc>>,

    /// Heuristic likelihood of reuse in [0, 1]; reporting only
    pub reusability_score: f64,
}

/// Caller-supplied metadata for an insert
///
/// Every field is optional; unset fields fall back to the cache defaults
/// (no tags, medium priority, default TTL).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataOverrides {
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub project: Option<String>,
    pub episode: Option<String>,
    pub character: Option<String>,
    pub scene: Option<String>,
    pub priority: Option<Priority>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl MetadataOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn episode(mut self, episode: impl Into<String>) -> Self {
        self.episode = Some(episode.into());
        self
    }

    pub fn character(mut self, character: impl Into<String>) -> Self {
        self.character = Some(character.into());
        self
    }

    pub fn scene(mut self, scene: impl Into<String>) -> Self {
        self.scene = Some(scene.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }
}

/// Reusability heuristic: 0.5 base, plus the element type's table bonus,
/// plus 0.2 x quality, plus 0.02 per variation (capped at 0.1), clamped to [0, 1]
pub fn reusability_score(element_type: &ElementType, payload: &VisualArtifact) -> f64 {
    let mut score = 0.5 + element_type.reusability_bonus();
    score += payload.quality_score * 0.2;
    if !payload.variations.is_empty() {
        score += (payload.variations.len() as f64 * 0.02).min(0.1);
    }
    score.clamp(0.0, 1.0)
}

/// Size of the payload as encoded JSON
pub fn estimate_size(payload: &VisualArtifact) -> Result<u64> {
    let encoded = serde_json::to_vec(payload)?;
    Ok(encoded.len() as u64)
}
