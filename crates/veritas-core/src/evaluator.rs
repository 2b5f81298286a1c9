//! The evaluator interface.
//!
//! Every concrete evaluator in `veritas-evaluators` implements this trait.
//! The trait is object-safe (via `async-trait`) so the registry and
//! orchestrator can hold evaluators as `Box<dyn Evaluator>`.

use std::collections::BTreeSet;

use async_trait::async_trait;
use veritas_contracts::config::EvaluatorConfig;
use veritas_contracts::contract::Contract;
use veritas_contracts::error::VeritasResult;
use veritas_contracts::evaluation::EvaluationResult;

/// A pluggable compliance evaluator.
///
/// Implementors must never let an error escape `evaluate`/`evaluate_async` —
/// unrecoverable failures are represented as a non-compliant
/// `EvaluationResult`, not as a propagated error. `initialize` is the
/// only fallible entry point, and even it is caught by the orchestrator
/// during construction rather than the pipeline.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Stable identifier used as the key in orchestrator result maps and in
    /// `project_report`'s Markdown/JSON sections.
    fn name(&self) -> &str;

    /// The metric identifiers this evaluator can produce, e.g.
    /// `fairness.score`, `content_safety.toxic_fraction`.
    fn supported_metrics(&self) -> BTreeSet<String>;

    /// Starting configuration; must include at least `threshold`.
    fn default_config(&self) -> EvaluatorConfig;

    /// Validate `config` and prepare dependencies. Returns
    /// `VeritasError::DependencyUnavailable` when a required external
    /// capability is absent and `config.use_mock_if_unavailable` is false.
    async fn initialize(&mut self, config: EvaluatorConfig) -> VeritasResult<()>;

    /// The asynchronous evaluation path. Never returns `Err` — internal
    /// failures are converted to a failed `EvaluationResult` by the
    /// implementation itself — evaluators never propagate errors across
    /// this boundary.
    async fn evaluate_async(&self, contract: &Contract) -> EvaluationResult;

    /// The synchronous evaluation path. The default wrapper blocks the current thread on a
    /// freshly-spawned single-threaded runtime; evaluators with a native
    /// synchronous implementation may override this for efficiency.
    fn evaluate(&self, contract: &Contract) -> EvaluationResult {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("failed to build current-thread runtime for synchronous evaluate()");
        runtime.block_on(self.evaluate_async(contract))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use std::collections::BTreeSet;
    use veritas_contracts::contract::{ContractBuilder, Interaction, ModelInfo};

    struct AlwaysCompliant;

    #[async_trait]
    impl Evaluator for AlwaysCompliant {
        fn name(&self) -> &str {
            "always_compliant"
        }

        fn supported_metrics(&self) -> BTreeSet<String> {
            BTreeSet::from(["always_compliant.score".to_string()])
        }

        fn default_config(&self) -> EvaluatorConfig {
            EvaluatorConfig::new(0.5)
        }

        async fn initialize(&mut self, _config: EvaluatorConfig) -> VeritasResult<()> {
            Ok(())
        }

        async fn evaluate_async(&self, _contract: &Contract) -> EvaluationResult {
            EvaluationResult::new("always_compliant", true, 1.0, Some(0.5), "ok", Map::new())
        }
    }

    fn sample_contract() -> Contract {
        ContractBuilder::new("demo", ModelInfo::new("m"))
            .interaction(Interaction::new("hi", "hello"))
            .build()
            .unwrap()
    }

    #[test]
    fn default_evaluate_wraps_evaluate_async() {
        let evaluator = AlwaysCompliant;
        let result = evaluator.evaluate(&sample_contract());
        assert!(result.compliant);
        assert_eq!(result.score, 1.0);
    }

    #[tokio::test]
    async fn evaluate_async_matches_evaluate() {
        let evaluator = AlwaysCompliant;
        let result = evaluator.evaluate_async(&sample_contract()).await;
        assert!(result.compliant);
    }
}
