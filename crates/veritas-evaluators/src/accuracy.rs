//! Accuracy / hallucination evaluator.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use veritas_contracts::config::EvaluatorConfig;
use veritas_contracts::contract::{Contract, Interaction};
use veritas_contracts::error::{VeritasError, VeritasResult};
use veritas_contracts::evaluation::EvaluationResult;
use veritas_core::evaluator::Evaluator;
use veritas_core::judge::{CriterionJudge, PatternJudge};

/// Lexical-overlap factual-consistency fallback, used for accuracy when no
/// external judge is configured. The
/// `CriterionJudge` trait carries no `context` parameter, so the overlap is
/// computed directly against the caller-supplied reference context rather
/// than through the trait.
fn factual_consistency_score(output_text: &str, context: &[String]) -> f64 {
    if context.is_empty() {
        return 0.5;
    }
    let output_tokens: BTreeSet<String> = tokenize(output_text);
    let context_tokens: BTreeSet<String> = context.iter().flat_map(|c| tokenize(c)).collect();
    if output_tokens.is_empty() {
        return 0.5;
    }
    let overlap = output_tokens.intersection(&context_tokens).count();
    (overlap as f64 / output_tokens.len() as f64).clamp(0.0, 1.0)
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(str::to_string)
        .collect()
}

pub struct AccuracyEvaluator {
    config: EvaluatorConfig,
    judge: Arc<dyn CriterionJudge>,
    /// Set during `initialize` when the judge is unavailable but
    /// `use_mock_if_unavailable` allowed construction to proceed anyway.
    using_mock: bool,
}

impl AccuracyEvaluator {
    pub fn new(judge: Arc<dyn CriterionJudge>) -> Self {
        Self {
            config: Self::static_default_config(),
            judge,
            using_mock: false,
        }
    }

    fn static_default_config() -> EvaluatorConfig {
        let mut config = EvaluatorConfig::new(0.7);
        config.extras = json!({
            "hallucination_threshold": 0.5,
            "factual_consistency_threshold": 0.5,
        })
        .as_object()
        .unwrap()
        .clone();
        config
    }

    fn reference_context(contract: &Contract) -> Vec<String> {
        contract
            .get("reference_context")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default()
    }

    async fn evaluate_interaction(&self, interaction: &Interaction, context: &[String]) -> Value {
        let hallucination_verdict = self
            .judge
            .judge("hallucination", &interaction.input_text, &interaction.output_text)
            .await;
        let hallucination_score = hallucination_verdict.score;
        let factual_consistency = factual_consistency_score(&interaction.output_text, context);

        let hallucination_threshold = self.config.get_f64("hallucination_threshold").unwrap_or(0.5);
        let consistency_threshold = self.config.get_f64("factual_consistency_threshold").unwrap_or(0.5);

        let has_hallucination = hallucination_score < hallucination_threshold;
        let factually_consistent = factual_consistency >= consistency_threshold;
        let interaction_compliant = !has_hallucination && factually_consistent;
        let interaction_score = hallucination_score.min(factual_consistency);

        json!({
            "interaction_id": interaction.interaction_id.to_string(),
            "hallucination_score": hallucination_score,
            "factual_consistency_score": factual_consistency,
            "has_hallucination": has_hallucination,
            "factually_consistent": factually_consistent,
            "compliant": interaction_compliant,
            "score": interaction_score,
        })
    }
}

impl Default for AccuracyEvaluator {
    fn default() -> Self {
        Self::new(Arc::new(PatternJudge))
    }
}

#[async_trait]
impl Evaluator for AccuracyEvaluator {
    fn name(&self) -> &str {
        "accuracy"
    }

    fn supported_metrics(&self) -> BTreeSet<String> {
        BTreeSet::from([
            "accuracy.score".to_string(),
            "accuracy.hallucination_score".to_string(),
            "accuracy.factual_consistency_score".to_string(),
        ])
    }

    fn default_config(&self) -> EvaluatorConfig {
        Self::static_default_config()
    }

    async fn initialize(&mut self, config: EvaluatorConfig) -> VeritasResult<()> {
        if !self.judge.is_available() {
            if !config.use_mock_if_unavailable {
                return Err(VeritasError::DependencyUnavailable {
                    evaluator: "accuracy".to_string(),
                    capability: "hallucination judge".to_string(),
                });
            }
            self.using_mock = true;
        } else {
            self.using_mock = false;
        }
        self.config = config;
        Ok(())
    }

    async fn evaluate_async(&self, contract: &Contract) -> EvaluationResult {
        if self.using_mock {
            let mut result = EvaluationResult::dependency_unavailable("accuracy", "hallucination judge");
            result.details.insert("using_mock".to_string(), Value::Bool(true));
            return result;
        }

        if contract.interactions.is_empty() {
            return EvaluationResult::empty("accuracy", "no interactions to evaluate");
        }

        let context = Self::reference_context(contract);
        let low_confidence = context.is_empty();

        let mut interaction_results = Vec::new();
        for interaction in &contract.interactions {
            interaction_results.push(self.evaluate_interaction(interaction, &context).await);
        }

        let score = interaction_results
            .iter()
            .map(|r| r["score"].as_f64().unwrap_or(0.0))
            .sum::<f64>()
            / interaction_results.len() as f64;
        let compliant = interaction_results.iter().all(|r| r["compliant"].as_bool().unwrap_or(false));

        let mut details = Map::new();
        details.insert("interaction_results".to_string(), json!(interaction_results));
        details.insert("low_confidence".to_string(), json!(low_confidence));

        let reason = if compliant {
            "no hallucination or factual inconsistency detected".to_string()
        } else {
            "hallucination or factual inconsistency detected in at least one interaction".to_string()
        };

        EvaluationResult::new("accuracy", compliant, score, Some(self.config.threshold), reason, details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veritas_contracts::contract::{ContractBuilder, ModelInfo};

    #[tokio::test]
    async fn missing_context_runs_with_low_confidence_flag() {
        let evaluator = AccuracyEvaluator::default();
        let contract = ContractBuilder::new("demo", ModelInfo::new("m"))
            .interaction(Interaction::new("q", "The sky is blue."))
            .build()
            .unwrap();
        let result = evaluator.evaluate_async(&contract).await;
        assert_eq!(result.details.get("low_confidence"), Some(&Value::Bool(true)));
    }

    #[tokio::test]
    async fn overlapping_context_is_factually_consistent() {
        let evaluator = AccuracyEvaluator::default();
        let contract = ContractBuilder::new("demo", ModelInfo::new("m"))
            .interaction(Interaction::new("q", "The capital of France is Paris."))
            .context("reference_context", json!(["The capital of France is Paris, a major European city."]))
            .build()
            .unwrap();
        let result = evaluator.evaluate_async(&contract).await;
        assert!(result.compliant);
    }

    #[tokio::test]
    async fn hallucinating_output_fails() {
        let evaluator = AccuracyEvaluator::default();
        let contract = ContractBuilder::new("demo", ModelInfo::new("m"))
            .interaction(Interaction::new("q", "I'm not sure, but I made this up entirely."))
            .context("reference_context", json!(["unrelated reference text"]))
            .build()
            .unwrap();
        let result = evaluator.evaluate_async(&contract).await;
        assert!(!result.compliant);
    }

    #[tokio::test]
    async fn strict_mode_dependency_unavailable_fails_initialization() {
        let mut evaluator = AccuracyEvaluator::new(Arc::new(veritas_core::judge::UnavailableJudge));
        let mut config = evaluator.default_config();
        config.use_mock_if_unavailable = false;
        let result = evaluator.initialize(config).await;
        assert!(matches!(result, Err(veritas_contracts::error::VeritasError::DependencyUnavailable { .. })));
    }

    #[tokio::test]
    async fn mock_fallback_dependency_unavailable_returns_diagnostic_result() {
        let mut evaluator = AccuracyEvaluator::new(Arc::new(veritas_core::judge::UnavailableJudge));
        let mut config = evaluator.default_config();
        config.use_mock_if_unavailable = true;
        evaluator.initialize(config).await.unwrap();

        let contract = ContractBuilder::new("demo", ModelInfo::new("m"))
            .interaction(Interaction::new("q", "anything at all"))
            .build()
            .unwrap();
        let result = evaluator.evaluate_async(&contract).await;
        assert!(!result.compliant);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.details.get("dependency_unavailable"), Some(&Value::Bool(true)));
        assert_eq!(result.details.get("using_mock"), Some(&Value::Bool(true)));
    }
}
