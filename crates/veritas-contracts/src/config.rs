//! Evaluator configuration: an explicit map with a typed `threshold` and an
//! `extras` catch-all, instead of a dynamic-attribute object.

use serde_json::{Map, Value};

/// A per-evaluator configuration, deserialized from a JSON/TOML-compatible
/// map. Every evaluator recognizes `threshold` and `use_mock_if_unavailable`
/// at minimum; anything else lands in `extras` for the evaluator to
/// interpret.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    pub threshold: f64,
    pub use_mock_if_unavailable: bool,
    pub extras: Map<String, Value>,
}

impl EvaluatorConfig {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            use_mock_if_unavailable: true,
            extras: Map::new(),
        }
    }

    /// Merge `overrides` over `self`, returning a new config. Immutable-copy
    /// semantics: neither `self` nor `overrides` is mutated in place.
    pub fn merged_with(&self, overrides: &Map<String, Value>) -> Self {
        let mut merged = self.clone();
        if let Some(threshold) = overrides.get("threshold").and_then(Value::as_f64) {
            merged.threshold = threshold;
        }
        if let Some(mock) = overrides.get("use_mock_if_unavailable").and_then(Value::as_bool) {
            merged.use_mock_if_unavailable = mock;
        }
        for (key, value) in overrides {
            if key == "threshold" || key == "use_mock_if_unavailable" {
                continue;
            }
            merged.extras.insert(key.clone(), value.clone());
        }
        merged
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.extras.get(key).and_then(Value::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.extras.get(key).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.extras.get(key).and_then(Value::as_bool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_overrides_threshold_and_preserves_extras() {
        let base = EvaluatorConfig::new(0.7);
        let overrides = json!({"threshold": 0.9, "toxicity_categories": ["hate", "violence"]})
            .as_object()
            .unwrap()
            .clone();
        let merged = base.merged_with(&overrides);
        assert_eq!(merged.threshold, 0.9);
        assert!(merged.extras.contains_key("toxicity_categories"));
    }

    #[test]
    fn base_config_untouched_by_merge() {
        let base = EvaluatorConfig::new(0.7);
        let overrides = json!({"threshold": 0.1}).as_object().unwrap().clone();
        let _ = base.merged_with(&overrides);
        assert_eq!(base.threshold, 0.7);
    }
}
