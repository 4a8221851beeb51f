//! Core type definitions for the cache system

use crate::error::CacheError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Cache key type - `"{element_type}_{digest}"`
pub type CacheKey = String;

/// Open-ended tag naming the kind of visual element an entry holds
///
/// Well-known tags are provided as constants; any other string is accepted and
/// scored with the generic defaults.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementType(Cow<'static, str>);

/// Base reusability bonus for each well-known element type
const REUSABILITY_TABLE: &[(&str, f64)] = &[
    ("character_design", 0.30),
    ("background_scene", 0.20),
    ("lighting_setup", 0.25),
    ("color_palette", 0.35),
    ("style_template", 0.40),
];

/// Bonus applied to element types missing from the table
const GENERIC_REUSABILITY: f64 = 0.10;

impl ElementType {
    pub const CHARACTER_DESIGN: ElementType = ElementType(Cow::Borrowed("character_design"));
    pub const BACKGROUND_SCENE: ElementType = ElementType(Cow::Borrowed("background_scene"));
    pub const LIGHTING_SETUP: ElementType = ElementType(Cow::Borrowed("lighting_setup"));
    pub const CAMERA_ANGLE: ElementType = ElementType(Cow::Borrowed("camera_angle"));
    pub const COLOR_PALETTE: ElementType = ElementType(Cow::Borrowed("color_palette"));
    pub const STYLE_TEMPLATE: ElementType = ElementType(Cow::Borrowed("style_template"));
    pub const VISUAL_EFFECT: ElementType = ElementType(Cow::Borrowed("visual_effect"));
    pub const TRANSITION_EFFECT: ElementType = ElementType(Cow::Borrowed("transition_effect"));

    /// Create a tag from any string
    pub fn new(tag: impl Into<String>) -> Self {
        ElementType(Cow::Owned(tag.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Type-dependent part of the reusability score
    pub fn reusability_bonus(&self) -> f64 {
        REUSABILITY_TABLE
            .iter()
            .find(|(tag, _)| *tag == self.as_str())
            .map(|(_, bonus)| *bonus)
            .unwrap_or(GENERIC_REUSABILITY)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementType {
    fn from(s: &str) -> Self {
        ElementType::new(s)
    }
}

impl From<String> for ElementType {
    fn from(s: String) -> Self {
        ElementType(Cow::Owned(s))
    }
}

/// Retention priority of an entry; lower priorities are evicted first
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Rank used by the priority eviction policy
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
            Priority::Critical => 3,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Critical => write!(f, "critical"),
        }
    }
}

/// Victim ordering used when the cache is over budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Least recently accessed first
    #[default]
    Lru,
    /// Least frequently accessed first
    Lfu,
    /// Oldest insertion first
    Fifo,
    /// Lowest priority first
    Priority,
    /// Soonest expiry first
    Ttl,
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionPolicy::Lru => write!(f, "lru"),
            EvictionPolicy::Lfu => write!(f, "lfu"),
            EvictionPolicy::Fifo => write!(f, "fifo"),
            EvictionPolicy::Priority => write!(f, "priority"),
            EvictionPolicy::Ttl => write!(f, "ttl"),
        }
    }
}

impl FromStr for EvictionPolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionPolicy::Lru),
            "lfu" => Ok(EvictionPolicy::Lfu),
            "fifo" => Ok(EvictionPolicy::Fifo),
            "priority" => Ok(EvictionPolicy::Priority),
            "ttl" => Ok(EvictionPolicy::Ttl),
            other => Err(CacheError::ConfigError(format!(
                "unknown eviction policy: {}",
                other
            ))),
        }
    }
}

/// Parameters the producer was invoked with; part of the cache key
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenerationParameters {
    pub service: String,
    pub resolution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Provider-specific extras
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional: BTreeMap<String, serde_json::Value>,
}

impl GenerationParameters {
    pub fn new(service: impl Into<String>, resolution: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            resolution: resolution.into(),
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.additional.insert(name.into(), value);
        self
    }

    /// JSON form identical to the serde encoding, built without a fallible serializer
    ///
    /// Non-finite floats become `null`, as `serde_json` does.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{Map, Value};

        let mut map = Map::new();
        map.insert("service".into(), Value::from(self.service.as_str()));
        map.insert("resolution".into(), Value::from(self.resolution.as_str()));
        if let Some(duration) = self.duration {
            map.insert("duration".into(), Value::from(duration));
        }
        if let Some(seed) = self.seed {
            map.insert("seed".into(), Value::from(seed));
        }
        if let Some(steps) = self.steps {
            map.insert("steps".into(), Value::from(steps));
        }
        if let Some(guidance) = self.guidance {
            map.insert("guidance".into(), Value::from(guidance));
        }
        if let Some(model) = &self.model {
            map.insert("model".into(), Value::from(model.as_str()));
        }
        if !self.additional.is_empty() {
            let extras: Map<String, Value> = self
                .additional
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            map.insert("additional".into(), Value::Object(extras));
        }
        Value::Object(map)
    }
}

/// An alternative rendition produced alongside the main artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variation {
    pub id: String,
    pub url: String,
    pub quality_score: f64,
    pub description: String,
}

/// Opaque generated artifact stored in the cache
///
/// The cache only looks at `quality_score` and `variations` (for scoring and
/// search) and at the encoded size; everything else passes through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualArtifact {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_url: Option<String>,
    /// Style summary (palette, lighting, composition ...)
    #[serde(default)]
    pub style_features: serde_json::Value,
    pub quality_score: f64,
    pub generation_parameters: GenerationParameters,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variations: Vec<Variation>,
}

impl VisualArtifact {
    pub fn new(
        prompt: impl Into<String>,
        quality_score: f64,
        generation_parameters: GenerationParameters,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            generated_url: None,
            style_features: serde_json::Value::Null,
            quality_score,
            generation_parameters,
            variations: Vec::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.generated_url = Some(url.into());
        self
    }

    pub fn with_style_features(mut self, features: serde_json::Value) -> Self {
        self.style_features = features;
        self
    }

    pub fn with_variation(mut self, variation: Variation) -> Self {
        self.variations.push(variation);
        self
    }
}
