//! Deterministic cache keys for generation requests
//!
//! A key is `"{element_type}_{digest}"` where the digest is the first 16 hex
//! digits of SHA-256 over a canonical JSON document. The prompt is trimmed and
//! lower-cased; every object in the parameters is written with sorted keys, so
//! the insertion order of extras never changes the key.

use crate::cache::types::{CacheKey, ElementType, GenerationParameters};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

const DIGEST_HEX_LEN: usize = 16;

/// Compute the cache key for a generation request
pub fn cache_key(
    element_type: &ElementType,
    prompt: &str,
    params: &GenerationParameters,
) -> CacheKey {
    let mut document = Map::new();
    document.insert("type".into(), Value::from(element_type.as_str()));
    document.insert("prompt".into(), Value::from(normalize_prompt(prompt)));
    document.insert("params".into(), params.to_json());
    let document = Value::Object(document);

    let mut canonical = String::new();
    write_canonical(&document, &mut canonical);

    let digest = Sha256::digest(canonical.as_bytes());
    let hex = hex::encode(digest);
    format!("{}_{}", element_type, &hex[..DIGEST_HEX_LEN])
}

/// Prompts differing only in case or surrounding whitespace share a key
pub fn normalize_prompt(prompt: &str) -> String {
    prompt.trim().to_lowercase()
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> GenerationParameters {
        GenerationParameters::new("runway", "1920x1080")
            .with_seed(42)
            .with_model("gen-3")
    }

    #[test]
    fn test_key_format() {
        let key = cache_key(&ElementType::CHARACTER_DESIGN, "Alice in forest", &params());
        assert!(key.starts_with("character_design_"));
        assert_eq!(key.len(), "character_design_".len() + DIGEST_HEX_LEN);
    }

    #[test]
    fn test_prompt_normalization() {
        let a = cache_key(&ElementType::CHARACTER_DESIGN, "Alice in forest", &params());
        let b = cache_key(&ElementType::CHARACTER_DESIGN, "  alice IN forest\n", &params());
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_inputs_distinct_keys() {
        let base = cache_key(&ElementType::CHARACTER_DESIGN, "Alice in forest", &params());
        let other_prompt = cache_key(&ElementType::CHARACTER_DESIGN, "Bob in city", &params());
        let other_type = cache_key(&ElementType::BACKGROUND_SCENE, "Alice in forest", &params());
        let other_seed = cache_key(
            &ElementType::CHARACTER_DESIGN,
            "Alice in forest",
            &params().with_seed(7),
        );

        assert_ne!(base, other_prompt);
        assert_ne!(base, other_type);
        assert_ne!(base, other_seed);
    }

    #[test]
    fn test_nested_object_order_is_irrelevant() {
        let first: Value = serde_json::from_str(r#"{"b": 1, "a": {"y": true, "x": [1, 2]}}"#).unwrap();
        let second: Value = serde_json::from_str(r#"{"a": {"x": [1, 2], "y": true}, "b": 1}"#).unwrap();

        let p1 = params().with_param("style", first);
        let p2 = params().with_param("style", second);

        assert_eq!(
            cache_key(&ElementType::STYLE_TEMPLATE, "noir", &p1),
            cache_key(&ElementType::STYLE_TEMPLATE, "noir", &p2)
        );
    }

    #[test]
    fn test_non_finite_parameters_still_key() {
        let mut nan = params();
        nan.guidance = Some(f64::NAN);
        let mut finite = params();
        finite.guidance = Some(7.5);

        let key = cache_key(&ElementType::LIGHTING_SETUP, "rim light", &nan);
        assert!(key.starts_with("lighting_setup_"));
        assert_ne!(key, cache_key(&ElementType::LIGHTING_SETUP, "rim light", &finite));
    }

    #[test]
    fn test_canonical_output_sorts_keys() {
        let value: Value = serde_json::from_str(r#"{"z": 1, "a": "s"}"#).unwrap();
        let mut out = String::new();
        write_canonical(&value, &mut out);
        assert_eq!(out, r#"{"a":"s","z":1}"#);
    }
}
