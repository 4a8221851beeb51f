//! Read-only analysis of the cache with recommended clean-up actions

use crate::cache::config::CacheConfig;
use crate::cache::entry::CacheEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entries accessed less often than this share of the mean are low-usage
const LOW_USAGE_RATIO: f64 = 0.3;

/// Share of a low-usage eviction's size counted towards potential savings
const EVICTION_SAVINGS_FACTOR: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Cleanup,
    Evict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Safe,
    Moderate,
}

/// One recommended action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationAction {
    pub kind: ActionKind,
    pub description: String,
    /// Bytes the action would free
    pub estimated_savings: u64,
    pub priority: ActionPriority,
    pub risk: RiskLevel,
}

/// Snapshot of cache utilisation and what could be reclaimed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub current_size: u64,
    pub max_size: u64,
    pub utilization_rate: f64,
    /// Normalised spread of entry sizes in [0, 1]
    pub fragmentation_level: f64,
    pub recommended_actions: Vec<OptimizationAction>,
    pub potential_savings: f64,
}

/// Analyse a set of entries against the configured budget
pub fn analyze<'a, I>(entries: I, config: &CacheConfig, now: DateTime<Utc>) -> OptimizationReport
where
    I: IntoIterator<Item = &'a CacheEntry>,
{
    let entries: Vec<&CacheEntry> = entries.into_iter().collect();
    let current_size: u64 = entries.iter().map(|e| e.size_bytes).sum();

    let mut recommended_actions = Vec::new();
    let mut potential_savings = 0.0;

    let (expired, live): (Vec<&CacheEntry>, Vec<&CacheEntry>) =
        entries.iter().partition(|e| e.is_expired(now));

    if !expired.is_empty() {
        let expired_size: u64 = expired.iter().map(|e| e.size_bytes).sum();
        recommended_actions.push(OptimizationAction {
            kind: ActionKind::Cleanup,
            description: format!("Remove {} expired entries", expired.len()),
            estimated_savings: expired_size,
            priority: ActionPriority::High,
            risk: RiskLevel::Safe,
        });
        potential_savings += expired_size as f64;
    }

    let low_usage = low_usage_entries(&live);
    if !low_usage.is_empty() {
        let low_usage_size: u64 = low_usage.iter().map(|e| e.size_bytes).sum();
        recommended_actions.push(OptimizationAction {
            kind: ActionKind::Evict,
            description: format!("Remove {} low-usage entries", low_usage.len()),
            estimated_savings: low_usage_size,
            priority: ActionPriority::Medium,
            risk: RiskLevel::Moderate,
        });
        potential_savings += low_usage_size as f64 * EVICTION_SAVINGS_FACTOR;
    }

    OptimizationReport {
        current_size,
        max_size: config.max_size_bytes,
        utilization_rate: current_size as f64 / config.max_size_bytes.max(1) as f64,
        fragmentation_level: fragmentation(&entries),
        recommended_actions,
        potential_savings,
    }
}

fn low_usage_entries<'a>(entries: &[&'a CacheEntry]) -> Vec<&'a CacheEntry> {
    if entries.is_empty() {
        return Vec::new();
    }
    let mean = entries.iter().map(|e| e.access_count as f64).sum::<f64>() / entries.len() as f64;
    entries
        .iter()
        .copied()
        .filter(|e| (e.access_count as f64) < mean * LOW_USAGE_RATIO)
        .collect()
}

/// `min(1, variance / mean^2)` over entry sizes
fn fragmentation(entries: &[&CacheEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    let n = entries.len() as f64;
    let mean = entries.iter().map(|e| e.size_bytes as f64).sum::<f64>() / n;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = entries
        .iter()
        .map(|e| (e.size_bytes as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    (variance / (mean * mean)).min(1.0)
}
