//! Filtering and similarity ranking over cached entries

use crate::cache::entry::CacheEntry;
use crate::cache::types::ElementType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Similarity at or above which a match counts as exact
pub const EXACT_MATCH_THRESHOLD: f64 = 0.95;

const WEIGHT_TYPE: f64 = 0.30;
const WEIGHT_TAGS: f64 = 0.20;
const WEIGHT_PROJECT: f64 = 0.15;
const WEIGHT_EPISODE: f64 = 0.15;
const WEIGHT_CHARACTER: f64 = 0.10;
const WEIGHT_SCENE: f64 = 0.10;

/// Search criteria; all filters are optional and AND-combined
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheQuery {
    pub element_type: Option<ElementType>,
    /// At least one of these must be on the entry
    #[serde(default)]
    pub tags: Vec<String>,
    pub project: Option<String>,
    pub episode: Option<String>,
    pub character: Option<String>,
    pub scene: Option<String>,
    pub min_quality_score: Option<f64>,
    /// Entries older than this (by creation time) are skipped
    pub max_age: Option<Duration>,
    /// Enables similarity scoring when set
    pub similarity_threshold: Option<f64>,
}

impl CacheQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element_type(mut self, element_type: ElementType) -> Self {
        self.element_type = Some(element_type);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
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

    pub fn min_quality_score(mut self, score: f64) -> Self {
        self.min_quality_score = Some(score);
        self
    }

    pub fn max_age(mut self, age: Duration) -> Self {
        self.max_age = Some(age);
        self
    }

    pub fn similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }

    /// Hard filters; expired entries never pass
    pub fn matches(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        if entry.is_expired(now) {
            return false;
        }

        let meta = &entry.metadata;

        if let Some(element_type) = &self.element_type {
            if &entry.element_type != element_type {
                return false;
            }
        }
        if !field_matches(&self.project, &meta.project)
            || !field_matches(&self.episode, &meta.episode)
            || !field_matches(&self.character, &meta.character)
            || !field_matches(&self.scene, &meta.scene)
        {
            return false;
        }
        if let Some(min) = self.min_quality_score {
            if entry.payload.quality_score < min {
                return false;
            }
        }
        if let Some(max_age) = self.max_age {
            if entry.age(now) > max_age {
                return false;
            }
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| entry.has_tag(t)) {
            return false;
        }

        true
    }

    /// Weighted similarity in [0, 1]
    ///
    /// Only signals the query specifies are evaluated. Each contributes its
    /// weight when it matches (tags scaled by overlap ratio), and the sum is
    /// divided by the number of evaluated signals. A query that specifies
    /// nothing scores 0.
    pub fn similarity(&self, entry: &CacheEntry) -> f64 {
        let meta = &entry.metadata;
        let mut score = 0.0;
        let mut evaluated = 0.0;

        if let Some(element_type) = &self.element_type {
            evaluated += 1.0;
            if &entry.element_type == element_type {
                score += WEIGHT_TYPE;
            }
        }

        if !self.tags.is_empty() {
            evaluated += 1.0;
            let common = self.tags.iter().filter(|t| entry.has_tag(t)).count();
            let larger = self.tags.len().max(meta.tags.len());
            score += WEIGHT_TAGS * common as f64 / larger as f64;
        }

        for (wanted, actual, weight) in [
            (&self.project, &meta.project, WEIGHT_PROJECT),
            (&self.episode, &meta.episode, WEIGHT_EPISODE),
            (&self.character, &meta.character, WEIGHT_CHARACTER),
            (&self.scene, &meta.scene, WEIGHT_SCENE),
        ] {
            if let Some(wanted) = wanted {
                evaluated += 1.0;
                if actual.as_deref() == Some(wanted.as_str()) {
                    score += weight;
                }
            }
        }

        if evaluated == 0.0 {
            0.0
        } else {
            (score / evaluated).clamp(0.0, 1.0)
        }
    }
}

fn field_matches(wanted: &Option<String>, actual: &Option<String>) -> bool {
    match wanted {
        Some(wanted) => actual.as_deref() == Some(wanted.as_str()),
        None => true,
    }
}

/// An entry above the similarity threshold but below exact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarMatch {
    pub entry: CacheEntry,
    pub similarity: f64,
}

/// Outcome of a cache search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheSearchResult {
    /// Every entry passing the hard filters
    pub matches: Vec<CacheEntry>,
    /// Similarity >= 0.95
    pub exact_matches: Vec<CacheEntry>,
    /// Threshold <= similarity < 0.95, best first
    pub similar_matches: Vec<SimilarMatch>,
    pub total_found: usize,
}

/// Run a query over a set of entries
pub fn search<'a, I>(entries: I, query: &CacheQuery, now: DateTime<Utc>) -> CacheSearchResult
where
    I: IntoIterator<Item = &'a CacheEntry>,
{
    let mut matches: Vec<CacheEntry> = entries
        .into_iter()
        .filter(|e| query.matches(e, now))
        .cloned()
        .collect();
    matches.sort_by(|a, b| a.key.cmp(&b.key));

    let mut exact_matches = Vec::new();
    let mut similar_matches = Vec::new();

    if let Some(threshold) = query.similarity_threshold {
        for entry in &matches {
            let similarity = query.similarity(entry);
            if similarity < threshold {
                continue;
            }
            if similarity >= EXACT_MATCH_THRESHOLD {
                exact_matches.push(entry.clone());
            } else {
                similar_matches.push(SimilarMatch {
                    entry: entry.clone(),
                    similarity,
                });
            }
        }
        similar_matches.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.entry.key.cmp(&b.entry.key))
        });
    }

    let total_found = matches.len();
    CacheSearchResult {
        matches,
        exact_matches,
        similar_matches,
        total_found,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::CacheMetadata;
    use crate::cache::types::{GenerationParameters, Priority, VisualArtifact};

    struct Fixture {
        key: &'static str,
        element_type: ElementType,
        tags: &'static [&'static str],
        project: Option<&'static str>,
        character: Option<&'static str>,
        quality: f64,
        age_secs: i64,
    }

    fn build(now: DateTime<Utc>, f: Fixture) -> CacheEntry {
        let created = now - chrono::Duration::seconds(f.age_secs);
        CacheEntry {
            key: f.key.to_string(),
            element_type: f.element_type,
            payload: VisualArtifact::new(f.key, f.quality, GenerationParameters::new("runway", "720p")),
            metadata: CacheMetadata {
                tags: f.tags.iter().map(|t| t.to_string()).collect(),
                project: f.project.map(str::to_string),
                episode: None,
                character: f.character.map(str::to_string),
                scene: None,
                priority: Priority::Medium,
                expires_at: Some(now + chrono::Duration::hours(1)),
                reusability_score: 0.5,
            },
            created_at: created,
            last_accessed_at: created,
            access_count: 1,
            size_bytes: 100,
        }
    }

    fn corpus(now: DateTime<Utc>) -> Vec<CacheEntry> {
        vec![
            build(now, Fixture {
                key: "alice",
                element_type: ElementType::CHARACTER_DESIGN,
                tags: &["hero", "forest"],
                project: Some("novel-1"),
                character: Some("alice"),
                quality: 0.9,
                age_secs: 10,
            }),
            build(now, Fixture {
                key: "bob",
                element_type: ElementType::CHARACTER_DESIGN,
                tags: &["villain"],
                project: Some("novel-1"),
                character: Some("bob"),
                quality: 0.4,
                age_secs: 5_000,
            }),
            build(now, Fixture {
                key: "forest",
                element_type: ElementType::BACKGROUND_SCENE,
                tags: &["forest"],
                project: Some("novel-2"),
                character: None,
                quality: 0.7,
                age_secs: 100,
            }),
        ]
    }

    fn keys(entries: &[CacheEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.key.as_str()).collect()
    }

    #[test]
    fn test_type_filter_is_strict() {
        let now = Utc::now();
        let entries = corpus(now);
        let query = CacheQuery::new().element_type(ElementType::CHARACTER_DESIGN);

        let result = search(&entries, &query, now);
        assert_eq!(keys(&result.matches), vec!["alice", "bob"]);
        assert!(result
            .matches
            .iter()
            .all(|e| e.element_type == ElementType::CHARACTER_DESIGN));
        assert_eq!(result.total_found, 2);
        assert!(result.exact_matches.is_empty());
    }

    #[test]
    fn test_quality_age_and_tag_filters() {
        let now = Utc::now();
        let entries = corpus(now);

        let quality = search(&entries, &CacheQuery::new().min_quality_score(0.5), now);
        assert_eq!(keys(&quality.matches), vec!["alice", "forest"]);

        let young = search(&entries, &CacheQuery::new().max_age(Duration::from_secs(600)), now);
        assert_eq!(keys(&young.matches), vec!["alice", "forest"]);

        let tagged = search(&entries, &CacheQuery::new().tag("forest").tag("missing"), now);
        assert_eq!(keys(&tagged.matches), vec!["alice", "forest"]);
    }

    #[test]
    fn test_expired_entries_excluded() {
        let now = Utc::now();
        let mut entries = corpus(now);
        entries[0].metadata.expires_at = Some(now - chrono::Duration::seconds(1));

        let result = search(&entries, &CacheQuery::new(), now);
        assert_eq!(keys(&result.matches), vec!["bob", "forest"]);
    }

    #[test]
    fn test_similarity_split() {
        let now = Utc::now();
        let entries = corpus(now);
        let query = CacheQuery::new()
            .project("novel-1")
            .character("alice")
            .similarity_threshold(0.1);

        // Hard filters keep only alice: (0.15 + 0.10) / 2 signals
        let result = search(&entries, &query, now);
        assert!(result.exact_matches.is_empty());
        assert_eq!(result.similar_matches.len(), 1);
        assert_eq!(result.similar_matches[0].entry.key, "alice");
        assert!((result.similar_matches[0].similarity - 0.125).abs() < 1e-9);
        assert!(result.similar_matches.len() <= result.matches.len());
    }

    #[test]
    fn test_similar_matches_sorted_descending() {
        let now = Utc::now();
        let entries = corpus(now);
        // Tag overlap is the only evaluated signal: alice carries both query
        // tags (0.20), forest carries one of two (0.10), bob fails the filter.
        let query = CacheQuery::new()
            .tag("forest")
            .tag("hero")
            .similarity_threshold(0.05);

        let result = search(&entries, &query, now);
        assert_eq!(keys(&result.matches), vec!["alice", "forest"]);
        assert!(result.exact_matches.is_empty());
        let ranked: Vec<&str> = result
            .similar_matches
            .iter()
            .map(|m| m.entry.key.as_str())
            .collect();
        assert_eq!(ranked, vec!["alice", "forest"]);
        assert!((result.similar_matches[0].similarity - 0.20).abs() < 1e-9);
        assert!((result.similar_matches[1].similarity - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_normalization() {
        let now = Utc::now();
        let entries = corpus(now);
        let alice = &entries[0];

        let partial = CacheQuery::new()
            .element_type(ElementType::CHARACTER_DESIGN)
            .project("novel-9");
        // 0.30 matched over two evaluated signals
        assert!((partial.similarity(alice) - 0.15).abs() < 1e-9);

        let type_only = CacheQuery::new().element_type(ElementType::CHARACTER_DESIGN);
        assert!((type_only.similarity(alice) - 0.30).abs() < 1e-9);

        assert_eq!(CacheQuery::new().similarity(alice), 0.0);
    }

    #[test]
    fn test_type_only_match_stays_below_threshold() {
        let now = Utc::now();
        let entries = corpus(now);
        let query = CacheQuery::new()
            .element_type(ElementType::CHARACTER_DESIGN)
            .similarity_threshold(0.5);

        let result = search(&entries, &query, now);
        assert_eq!(result.total_found, 2);
        assert!(result.exact_matches.is_empty());
        assert!(result.similar_matches.is_empty());
    }

    #[test]
    fn test_no_threshold_no_scoring() {
        let now = Utc::now();
        let entries = corpus(now);
        let result = search(&entries, &CacheQuery::new().project("novel-1"), now);
        assert_eq!(result.total_found, 2);
        assert!(result.exact_matches.is_empty());
        assert!(result.similar_matches.is_empty());
    }
}
