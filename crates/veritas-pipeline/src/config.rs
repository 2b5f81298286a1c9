//! Per-domain configuration defaults and the merge step that layers caller
//! overrides on top of them.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

/// Baseline per-evaluator overrides for a contract's `context.domain`.
/// Healthcare and finance carry stricter thresholds than the evaluator's
/// own defaults, reflecting the heavier compliance burden those domains
/// attract in the regulatory frameworks this crate targets (the exact
/// weights are heuristic, not a documented regulatory requirement — see
/// `DESIGN.md`). Callers still win: `merge_config_maps` applies these first
/// and lets the caller's own `config_map` override any key.
pub fn domain_defaults(domain: Option<&str>) -> BTreeMap<String, Map<String, Value>> {
    let mut defaults = BTreeMap::new();
    match domain {
        Some("healthcare") => {
            defaults.insert("risk_management".to_string(), json!({"threshold": 0.8}).as_object().unwrap().clone());
            defaults.insert("content_safety".to_string(), json!({"threshold": 0.9}).as_object().unwrap().clone());
            defaults.insert("accuracy".to_string(), json!({"threshold": 0.85}).as_object().unwrap().clone());
        }
        Some("finance") => {
            defaults.insert("risk_management".to_string(), json!({"threshold": 0.8}).as_object().unwrap().clone());
            defaults.insert("fairness".to_string(), json!({"threshold": 0.8}).as_object().unwrap().clone());
        }
        _ => {}
    }
    defaults
}

/// Layers `overrides` on top of `base`, per evaluator name, per key. A key
/// present in both wins from `overrides`; a key present only in `base`
/// survives untouched. Immutable-copy semantics: neither input is mutated
/// in place.
pub fn merge_config_maps(
    base: BTreeMap<String, Map<String, Value>>,
    overrides: &BTreeMap<String, Map<String, Value>>,
) -> BTreeMap<String, Map<String, Value>> {
    let mut merged = base;
    for (name, override_map) in overrides {
        let entry = merged.entry(name.clone()).or_default();
        for (key, value) in override_map {
            entry.insert(key.clone(), value.clone());
        }
    }
    merged
}
