//! The evaluator registry.
//!
//! Maps metric identifiers to the evaluator factories that advertise them.
//! Because `Evaluator` instances are not guaranteed thread-safe, the
//! registry stores constructor closures rather than shared instances — the
//! orchestrator asks it to `discover` the factories it needs and then
//! constructs fresh evaluator instances for the run.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, OnceLock};

use tracing::{info, warn};

use crate::evaluator::Evaluator;

/// A factory producing a fresh, uninitialized evaluator instance.
pub type EvaluatorFactory = fn() -> Box<dyn Evaluator>;

/// Maps metric identifiers to the evaluator factories that can produce them.
#[derive(Default)]
pub struct EvaluatorRegistry {
    by_metric: BTreeMap<String, Vec<(String, EvaluatorFactory)>>,
    names: BTreeSet<String>,
}

impl EvaluatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one evaluator factory, indexing it under every metric its
    /// instance advertises. Idempotent by evaluator name.
    pub fn register(&mut self, name: impl Into<String>, factory: EvaluatorFactory) {
        let name = name.into();
        if self.names.contains(&name) {
            return;
        }
        let probe = factory();
        for metric in probe.supported_metrics() {
            self.by_metric
                .entry(metric)
                .or_default()
                .push((name.clone(), factory));
        }
        self.names.insert(name);
    }

    /// Normalize a metric identifier by stripping an optional `metrics.`
    /// prefix: both the unprefixed and `metrics.`-prefixed forms route to
    /// the same evaluators.
    fn canonical(metric: &str) -> &str {
        metric.strip_prefix("metrics.").unwrap_or(metric)
    }

    /// Return the minimum cover of evaluator factories advertising any of
    /// `required_metrics`. Duplicates are de-duplicated by evaluator name.
    pub fn discover(&self, required_metrics: &BTreeSet<String>) -> Vec<(String, EvaluatorFactory)> {
        let mut seen = BTreeSet::new();
        let mut covered_metrics = BTreeSet::new();
        let mut out = Vec::new();
        for metric in required_metrics {
            let canonical = Self::canonical(metric);
            if let Some(factories) = self.by_metric.get(canonical) {
                covered_metrics.insert(metric.clone());
                for (name, factory) in factories {
                    if seen.insert(name.clone()) {
                        out.push((name.clone(), *factory));
                    }
                }
            }
        }
        let uncovered: Vec<&String> = required_metrics.difference(&covered_metrics).collect();
        if !uncovered.is_empty() {
            warn!(?uncovered, "no registered evaluator advertises these required metrics");
        }
        out
    }

    /// All registered evaluator names, in registration order is not
    /// preserved (a `BTreeSet` is lexicographic); used when
    /// `selected_evaluator_names` is null, to activate every built-in.
    pub fn all(&self) -> Vec<(String, EvaluatorFactory)> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for factories in self.by_metric.values() {
            for (name, factory) in factories {
                if seen.insert(name.clone()) {
                    out.push((name.clone(), *factory));
                }
            }
        }
        out
    }
}

static REGISTRY: OnceLock<EvaluatorRegistry> = OnceLock::new();
static INIT_GUARD: Mutex<()> = Mutex::new(());

/// Thread-safe one-shot registration of all built-in evaluators, guarded
/// by a mutex and a sentinel. Re-entry is a no-op — the `OnceLock` only
/// ever runs the initializer once regardless of how many threads race to
/// call this function.
pub fn initialize_once(register_builtins: impl FnOnce(&mut EvaluatorRegistry)) -> &'static EvaluatorRegistry {
    let _guard = INIT_GUARD.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    REGISTRY.get_or_init(|| {
        info!("initializing evaluator registry");
        let mut registry = EvaluatorRegistry::new();
        register_builtins(&mut registry);
        registry
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Map;
    use veritas_contracts::config::EvaluatorConfig;
    use veritas_contracts::contract::Contract;
    use veritas_contracts::error::VeritasResult;
    use veritas_contracts::evaluation::EvaluationResult;

    struct Fairness;
    struct ContentSafety;

    #[async_trait]
    impl Evaluator for Fairness {
        fn name(&self) -> &str {
            "fairness"
        }
        fn supported_metrics(&self) -> BTreeSet<String> {
            BTreeSet::from(["fairness.score".to_string(), "fairness.stereotype_score".to_string()])
        }
        fn default_config(&self) -> EvaluatorConfig {
            EvaluatorConfig::new(0.7)
        }
        async fn initialize(&mut self, _config: EvaluatorConfig) -> VeritasResult<()> {
            Ok(())
        }
        async fn evaluate_async(&self, _contract: &Contract) -> EvaluationResult {
            EvaluationResult::new("fairness", true, 1.0, Some(0.7), "ok", Map::new())
        }
    }

    #[async_trait]
    impl Evaluator for ContentSafety {
        fn name(&self) -> &str {
            "content_safety"
        }
        fn supported_metrics(&self) -> BTreeSet<String> {
            BTreeSet::from(["content_safety.toxic_fraction".to_string()])
        }
        fn default_config(&self) -> EvaluatorConfig {
            EvaluatorConfig::new(0.8)
        }
        async fn initialize(&mut self, _config: EvaluatorConfig) -> VeritasResult<()> {
            Ok(())
        }
        async fn evaluate_async(&self, _contract: &Contract) -> EvaluationResult {
            EvaluationResult::new("content_safety", true, 1.0, Some(0.8), "ok", Map::new())
        }
    }

    fn test_registry() -> EvaluatorRegistry {
        let mut registry = EvaluatorRegistry::new();
        registry.register("fairness", || Box::new(Fairness));
        registry.register("content_safety", || Box::new(ContentSafety));
        registry
    }

    #[test]
    fn discover_returns_union_of_matching_evaluators() {
        let registry = test_registry();
        let required = BTreeSet::from(["fairness.score".to_string()]);
        let discovered = registry.discover(&required);
        assert_eq!(discovered.len(), 1);
        assert_eq!(discovered[0].0, "fairness");
    }

    #[test]
    fn discover_deduplicates_by_name_across_overlapping_metrics() {
        let registry = test_registry();
        let required = BTreeSet::from([
            "fairness.score".to_string(),
            "fairness.stereotype_score".to_string(),
        ]);
        let discovered = registry.discover(&required);
        assert_eq!(discovered.len(), 1);
    }

    #[test]
    fn discover_accepts_metrics_prefixed_aliases() {
        let registry = test_registry();
        let required = BTreeSet::from(["metrics.fairness.score".to_string()]);
        let discovered = registry.discover(&required);
        assert_eq!(discovered.len(), 1);
        assert_eq!(discovered[0].0, "fairness");
    }

    #[test]
    fn discover_warns_on_uncovered_metrics_but_does_not_fail() {
        let registry = test_registry();
        let required = BTreeSet::from(["nonexistent.metric".to_string()]);
        let discovered = registry.discover(&required);
        assert!(discovered.is_empty());
    }

    #[test]
    fn register_is_idempotent_by_name() {
        let mut registry = EvaluatorRegistry::new();
        registry.register("fairness", || Box::new(Fairness));
        registry.register("fairness", || Box::new(Fairness));
        assert_eq!(registry.all().len(), 1);
    }
}
