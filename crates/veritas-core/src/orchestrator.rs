//! The compliance evaluator / orchestrator.
//!
//! Instantiates a selected subset of evaluators with a merged configuration,
//! runs them concurrently with per-task failure isolation, aggregates their
//! results, and projects a report.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};
use tracing::{info, warn};
use veritas_contracts::config::EvaluatorConfig;
use veritas_contracts::contract::Contract;
use veritas_contracts::error::{VeritasError, VeritasResult};
use veritas_contracts::evaluation::EvaluationResult;
use veritas_contracts::report::{Report, ReportFormat};

use crate::evaluator::Evaluator;
use crate::registry::{EvaluatorFactory, EvaluatorRegistry};

/// The default per-evaluator timeout used when the pipeline does not
/// override it: the overall 120-second default is enforced by the
/// pipeline; individual evaluators get the same ceiling unless the caller
/// narrows it.
pub const DEFAULT_EVALUATOR_TIMEOUT: Duration = Duration::from_secs(120);

/// The evaluator orchestrator. Construct with `ComplianceEvaluator::new`,
/// which performs failure-isolated initialization: an evaluator that
/// fails to initialize is logged and excluded rather than aborting
/// construction, unless every evaluator fails.
pub struct ComplianceEvaluator {
    evaluators: Vec<(String, Arc<dyn Evaluator>)>,
}

impl ComplianceEvaluator {
    /// `selected_evaluator_names`: `None` activates every evaluator the
    /// registry knows; `Some(names)` restricts to that subset.
    /// `config_map`: per-evaluator configuration overrides, merged over each
    /// evaluator's `default_config()`.
    /// `mock_fallback`: injected as `use_mock_if_unavailable` into any
    /// evaluator config that does not already set it explicitly.
    pub async fn new(
        registry: &EvaluatorRegistry,
        selected_evaluator_names: Option<&[String]>,
        config_map: &BTreeMap<String, Map<String, Value>>,
        mock_fallback: bool,
    ) -> VeritasResult<Self> {
        let candidates: Vec<(String, EvaluatorFactory)> = match selected_evaluator_names {
            Some(names) => registry
                .all()
                .into_iter()
                .filter(|(name, _)| names.contains(name))
                .collect(),
            None => registry.all(),
        };

        let mut evaluators = Vec::new();
        for (name, factory) in candidates {
            let mut instance = factory();
            let mut config = instance.default_config();
            if let Some(overrides) = config_map.get(&name) {
                config = config.merged_with(overrides);
                if !overrides.contains_key("use_mock_if_unavailable") {
                    config.use_mock_if_unavailable = mock_fallback;
                }
            } else {
                config.use_mock_if_unavailable = mock_fallback;
            }

            match instance.initialize(config).await {
                Ok(()) => {
                    info!(evaluator = %name, "initialized");
                    evaluators.push((name, Arc::from(instance)));
                }
                Err(err) => {
                    warn!(evaluator = %name, error = %err, "failed to initialize, excluding");
                }
            }
        }

        if evaluators.is_empty() {
            return Err(VeritasError::Config {
                reason: "zero evaluators initialized successfully".to_string(),
            });
        }

        Ok(Self { evaluators })
    }

    /// Run every active evaluator concurrently against `contract`, applying
    /// `timeout` to each. A per-evaluator timeout or panic is coerced into a
    /// failed `EvaluationResult` rather than aborting the aggregate.
    pub async fn evaluate_async(
        &self,
        contract: &Contract,
        timeout: Duration,
    ) -> BTreeMap<String, EvaluationResult> {
        let mut handles = Vec::with_capacity(self.evaluators.len());
        for (name, evaluator) in &self.evaluators {
            let evaluator = Arc::clone(evaluator);
            let contract = contract.clone();
            let name = name.clone();
            let handle = tokio::spawn(async move {
                tokio::time::timeout(timeout, evaluator.evaluate_async(&contract)).await
            });
            handles.push((name, handle));
        }

        let mut results = BTreeMap::new();
        for (name, handle) in handles {
            let result = match handle.await {
                Ok(Ok(result)) => result,
                Ok(Err(_elapsed)) => {
                    warn!(evaluator = %name, "evaluator timed out");
                    EvaluationResult::error(&name, "evaluator timed out")
                }
                Err(_join_error) => {
                    warn!(evaluator = %name, "evaluator task panicked");
                    EvaluationResult::error(&name, "evaluator task panicked")
                }
            };
            results.insert(name, result);
        }
        results
    }

    /// `true` iff the result map is non-empty and every result is compliant.
    pub fn is_compliant(results: &BTreeMap<String, EvaluationResult>) -> bool {
        !results.is_empty() && results.values().all(|r| r.compliant)
    }

    /// Project the aggregate result map into a `Report`.
    pub fn project_report(
        results: &BTreeMap<String, EvaluationResult>,
        format: ReportFormat,
    ) -> VeritasResult<Report> {
        match format {
            ReportFormat::Json => Ok(Report::new(project_json(results), ReportFormat::Json)),
            ReportFormat::Markdown => Ok(Report::new(project_markdown(results), ReportFormat::Markdown)),
            ReportFormat::Pdf | ReportFormat::Html => Err(VeritasError::ReportGeneration {
                reason: format!("{:?} report rendering is out of scope for the core", format),
            }),
        }
    }
}

fn project_json(results: &BTreeMap<String, EvaluationResult>) -> String {
    let evaluation_results: Map<String, Value> = results
        .iter()
        .map(|(name, result)| (name.clone(), serde_json::to_value(result).unwrap_or(Value::Null)))
        .collect();
    let body = json!({
        "evaluation_results": evaluation_results,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "overall_compliant": ComplianceEvaluator::is_compliant(results),
    });
    serde_json::to_string_pretty(&body).unwrap_or_else(|_| "{}".to_string())
}

fn project_markdown(results: &BTreeMap<String, EvaluationResult>) -> String {
    let overall = ComplianceEvaluator::is_compliant(results);
    let mut out = String::new();
    out.push_str("# AI Compliance Evaluation Report\n\n");
    out.push_str(&format!(
        "## Overall Compliance: {}\n\n",
        if overall { "PASS" } else { "FAIL" }
    ));
    out.push_str("| Evaluator | Compliance | Score | Threshold |\n");
    out.push_str("|---|---|---|---|\n");
    for (name, result) in results {
        let threshold = result
            .threshold
            .map(|t| format!("{t:.2}"))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "| {} | {} | {:.2} | {} |\n",
            name,
            if result.compliant { "PASS" } else { "FAIL" },
            result.score,
            threshold
        ));
    }
    out.push('\n');
    for (name, result) in results {
        out.push_str(&format!("## {name}\n\n"));
        out.push_str(&format!(
            "- Compliance: {}\n",
            if result.compliant { "PASS" } else { "FAIL" }
        ));
        out.push_str(&format!("- Score: {:.2}\n", result.score));
        if let Some(threshold) = result.threshold {
            out.push_str(&format!("- Threshold: {threshold:.2}\n"));
        }
        out.push_str(&format!("- Reason: {}\n\n", result.reason));
        out.push_str("```json\n");
        out.push_str(
            &serde_json::to_string_pretty(&result.details).unwrap_or_else(|_| "{}".to_string()),
        );
        out.push_str("\n```\n\n");
    }
    out
}
