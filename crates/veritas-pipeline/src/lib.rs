//! # veritas-pipeline
//!
//! The end-to-end compliance pipeline: given a contract and a
//! policy-folder selector, resolves the folder to its required metrics,
//! discovers and runs the covering evaluators (phase-1), forwards their
//! output to the policy engine (phase-2), and synthesizes a combined
//! compliance verdict and report.
//!
//! This crate owns the wiring between `veritas-core`'s orchestrator and
//! `veritas-policy`'s loader/driver for the lifetime of a single `evaluate`
//! call; the registry, evaluators, and loader it draws on are otherwise
//! process- or call-scoped collaborators passed in by the caller, not
//! reached for through a module-level singleton.

pub mod config;
pub mod report;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{json, Map, Value};
use tracing::{info, warn};

use veritas_contracts::contract::Contract;
use veritas_contracts::error::{VeritasError, VeritasResult};
use veritas_contracts::evaluation::EvaluationResult;
use veritas_contracts::policy::PolicyResult;
use veritas_contracts::report::{Report, ReportFormat};
use veritas_core::orchestrator::{ComplianceEvaluator, DEFAULT_EVALUATOR_TIMEOUT};
use veritas_core::registry::EvaluatorRegistry;
use veritas_policy::{PolicyEngineDriver, PolicyLoader};

pub use config::domain_defaults;
pub use report::project_combined_report;

/// Overall pipeline timeout default (120 seconds for the full end-to-end
/// evaluation). Reused as the per-evaluator timeout
/// passed to the orchestrator — the orchestrator bounds each evaluator to
/// this ceiling individually rather than the pipeline imposing a second,
/// outer deadline on top of it.
pub const DEFAULT_PIPELINE_TIMEOUT: Duration = DEFAULT_EVALUATOR_TIMEOUT;

/// Phase-1 plus phase-2 results, and whatever came of projecting a report
/// from them.
///
/// Report generation failure (an out-of-scope format) is surfaced via
/// `report_error` rather than aborting the call — the caller always gets
/// the compliance verdict even if rendering failed.
#[derive(Debug)]
pub struct PipelineResult {
    pub phase1: BTreeMap<String, EvaluationResult>,
    pub phase2: Vec<PolicyResult>,
    pub overall_compliant: bool,
    pub report: Option<Report>,
    pub report_path: Option<PathBuf>,
    pub report_error: Option<VeritasError>,
}

/// End-to-end compliance pipeline. Construct once per evaluation call
/// with the process-lifetime registry and a loaded policy snapshot, plus an
/// engine driver (embedded or server mode).
pub struct CompliancePipeline<'a> {
    registry: &'a EvaluatorRegistry,
    loader: &'a PolicyLoader,
    engine: &'a PolicyEngineDriver,
    config_map: BTreeMap<String, Map<String, Value>>,
    mock_fallback: bool,
    evaluator_timeout: Duration,
}

impl<'a> CompliancePipeline<'a> {
    pub fn new(registry: &'a EvaluatorRegistry, loader: &'a PolicyLoader, engine: &'a PolicyEngineDriver) -> Self {
        Self {
            registry,
            loader,
            engine,
            config_map: BTreeMap::new(),
            mock_fallback: true,
            evaluator_timeout: DEFAULT_PIPELINE_TIMEOUT,
        }
    }

    /// Caller-supplied per-evaluator configuration overrides, applied on
    /// top of the per-domain defaults.
    pub fn with_config(mut self, config_map: BTreeMap<String, Map<String, Value>>) -> Self {
        self.config_map = config_map;
        self
    }

    pub fn with_mock_fallback(mut self, mock_fallback: bool) -> Self {
        self.mock_fallback = mock_fallback;
        self
    }

    pub fn with_evaluator_timeout(mut self, timeout: Duration) -> Self {
        self.evaluator_timeout = timeout;
        self
    }

    /// The main entry point. `policy_folder` is a selector passed to
    /// the loader (an alias like `eu_ai_act` or an explicit category path);
    /// `output_dir`, if given, persists the rendered report to disk.
    pub async fn evaluate(
        &self,
        contract: &Contract,
        policy_folder: &str,
        report_format: ReportFormat,
        output_dir: Option<&Path>,
    ) -> VeritasResult<PipelineResult> {
        // Step 1: validate. A `Contract` built through `ContractBuilder`
        // already satisfies the domain invariants, but one deserialized
        // straight from JSON has not been re-checked, so we always
        // re-validate here.
        contract.validate()?;

        // Step 2: resolve the selector to concrete folders.
        let matched_folders = self.loader.find_matching_folders(policy_folder);
        if matched_folders.is_empty() {
            return Err(VeritasError::NoMatchingPolicy {
                selector: policy_folder.to_string(),
            });
        }
        info!(policy_folder, folders = ?matched_folders, "resolved policy selector");

        // Step 3: required metrics, from the first matched folder.
        let primary_folder = &matched_folders[0];
        let required_metrics = self.loader.get_required_metrics_for_folder(primary_folder);

        // Step 4: discover the covering evaluators. Zero required metrics
        // declared means run every active evaluator.
        let selected_names: Option<Vec<String>> = if required_metrics.is_empty() {
            None
        } else {
            let discovered = self.registry.discover(&required_metrics);
            Some(discovered.into_iter().map(|(name, _)| name).collect())
        };

        // Step 5: effective config — per-domain defaults merged with
        // caller overrides (caller wins on any key both sides set).
        let effective_config = config::merge_config_maps(domain_defaults(contract.domain()), &self.config_map);

        let orchestrator = ComplianceEvaluator::new(
            self.registry,
            selected_names.as_deref(),
            &effective_config,
            self.mock_fallback,
        )
        .await?;

        // Step 6: phase-1, the evaluator run.
        let phase1 = orchestrator.evaluate_async(contract, self.evaluator_timeout).await;
        let overall_phase1 = ComplianceEvaluator::is_compliant(&phase1);

        // Step 7: policy input, shared across every matched folder.
        let contract_value = serde_json::to_value(contract).unwrap_or(Value::Null);
        let phase1_value: Map<String, Value> = phase1
            .iter()
            .map(|(name, result)| (name.clone(), serde_json::to_value(result).unwrap_or(Value::Null)))
            .collect();
        let policy_input = json!({
            "contract": contract_value,
            "evaluation": Value::Object(phase1_value),
        });

        // Step 8: policy evaluation. Every folder the selector matched is
        // evaluated independently; overall compliance is their conjunction
        // (step 9 below), which makes a selector that matches several
        // categories — e.g. both `fairness` and `risk_management` under one
        // framework — a meaningful "all must pass" gate rather than picking
        // one arbitrarily.
        let mut phase2 = Vec::with_capacity(matched_folders.len());
        for folder in &matched_folders {
            let package_path = self.loader.get_policy_package_path(folder);
            let result = self.engine.evaluate_policy_category(&package_path, &policy_input, None).await;
            phase2.push(result);
        }

        // Step 9: overall compliance.
        let overall_phase2 = phase2.iter().all(|result| result.overall_result);
        let overall_compliant = overall_phase1 && overall_phase2;

        // Step 10: report projection, optionally persisted to disk.
        let mut report = None;
        let mut report_path = None;
        let mut report_error = None;
        match project_combined_report(&phase1, &phase2, overall_compliant, report_format) {
            Ok(rendered) => {
                if let Some(dir) = output_dir {
                    match write_report(dir, &contract.application_name, &rendered).await {
                        Ok(path) => report_path = Some(path),
                        Err(error) => {
                            warn!(%error, "failed to persist report to output_dir");
                            report_error = Some(error);
                        }
                    }
                }
                report = Some(rendered);
            }
            Err(error) => {
                warn!(%error, ?report_format, "report projection failed");
                report_error = Some(error);
            }
        }

        Ok(PipelineResult {
            phase1,
            phase2,
            overall_compliant,
            report,
            report_path,
            report_error,
        })
    }
}

/// Writes `report` under `dir`, creating it if missing,
/// using the `compliance_report_<application_name>_<timestamp>.{ext}`
/// naming convention.
async fn write_report(dir: &Path, application_name: &str, report: &Report) -> VeritasResult<PathBuf> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| VeritasError::ReportGeneration {
        reason: format!("failed to create output directory {}: {e}", dir.display()),
    })?;
    let file_name = format!(
        "{}.{}",
        Report::file_name(application_name),
        report.format.file_extension()
    );
    let path = dir.join(file_name);
    tokio::fs::write(&path, &report.content).await.map_err(|e| VeritasError::ReportGeneration {
        reason: format!("failed to write report to {}: {e}", path.display()),
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use veritas_contracts::contract::{ContractBuilder, Interaction, ModelInfo};
    use veritas_core::registry::initialize_once;
    use veritas_policy::engine::EngineRunMode;

    fn registry() -> &'static EvaluatorRegistry {
        initialize_once(veritas_evaluators::register_builtins)
    }

    fn healthy_contract() -> Contract {
        ContractBuilder::new("acme-triage", ModelInfo::new("gpt-test"))
            .interaction(Interaction::new(
                "What should I do about a mild headache?",
                "Rest, hydrate, and consider an over-the-counter pain reliever if needed.",
            ))
            .context("domain", "healthcare")
            .context("risk_documentation", "risk assessment: identification, classification, severity, probability. mitigation measures: control measures, implementation, responsibility, timeline. monitoring system: tracking, alerts, review, reporting.")
            .context("patient_data", json!({"age_group": "adult"}))
            .build()
            .unwrap()
    }

    struct TempDir(PathBuf);
    impl TempDir {
        fn new(label: &str) -> Self {
            let mut path = std::env::temp_dir();
            path.push(format!("veritas-pipeline-test-{label}-{}", std::process::id()));
            fs::create_dir_all(&path).unwrap();
            Self(path)
        }
        fn path(&self) -> &Path {
            &self.0
        }
    }
    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    fn write_policy_folder(root: &Path) {
        let folder = root.join("healthcare/hipaa");
        fs::create_dir_all(&folder).unwrap();
        fs::write(
            folder.join("policy.meta.toml"),
            "required_metrics = [\"risk_management.score\", \"content_safety.score\"]\n",
        )
        .unwrap();
        fs::write(folder.join("rules.rego"), "package healthcare.hipaa\n").unwrap();
    }

    async fn unreachable_engine() -> PolicyEngineDriver {
        PolicyEngineDriver::embedded(PathBuf::from("/nonexistent/policy-engine-binary"), EngineRunMode::Production, true).await
    }

    #[tokio::test]
    async fn happy_path_matches_folder_runs_evaluators_and_reports() {
        let policy_root = TempDir::new("happy");
        write_policy_folder(policy_root.path());
        let loader = PolicyLoader::load(policy_root.path()).unwrap();
        let engine = unreachable_engine().await;
        let pipeline = CompliancePipeline::new(registry(), &loader, &engine);

        let result = pipeline
            .evaluate(&healthy_contract(), "healthcare", ReportFormat::Json, None)
            .await
            .unwrap();

        assert!(!result.phase1.is_empty());
        assert!(result.phase1.contains_key("risk_management"));
        assert!(result.phase1.contains_key("content_safety"));
        assert_eq!(result.phase2.len(), 1);
        assert!(result.report.is_some());
        assert!(result.report_error.is_none());
    }

    #[tokio::test]
    async fn unmatched_selector_is_no_matching_policy_error() {
        let policy_root = TempDir::new("unmatched");
        write_policy_folder(policy_root.path());
        let loader = PolicyLoader::load(policy_root.path()).unwrap();
        let engine = unreachable_engine().await;
        let pipeline = CompliancePipeline::new(registry(), &loader, &engine);

        let result = pipeline
            .evaluate(&healthy_contract(), "nonexistent_framework", ReportFormat::Json, None)
            .await;
        assert!(matches!(result, Err(VeritasError::NoMatchingPolicy { .. })));
    }

    #[tokio::test]
    async fn finance_contract_missing_customer_data_fails_validation() {
        let policy_root = TempDir::new("finance-invalid");
        write_policy_folder(policy_root.path());
        let loader = PolicyLoader::load(policy_root.path()).unwrap();
        let engine = unreachable_engine().await;
        let pipeline = CompliancePipeline::new(registry(), &loader, &engine);

        let contract = Contract {
            contract_id: uuid::Uuid::new_v4(),
            application_name: "lender-app".to_string(),
            model_info: ModelInfo::new("m"),
            interactions: vec![Interaction::new("apply for loan", "approved")],
            final_output: None,
            context: json!({"domain": "finance", "risk_documentation": "some text"}).as_object().unwrap().clone(),
            compliance_context: Map::new(),
        };

        let result = pipeline.evaluate(&contract, "healthcare", ReportFormat::Json, None).await;
        assert!(matches!(result, Err(VeritasError::Validation { .. })));
    }

    #[tokio::test]
    async fn policy_engine_unavailable_yields_non_compliant_without_panicking() {
        let policy_root = TempDir::new("engine-down");
        write_policy_folder(policy_root.path());
        let loader = PolicyLoader::load(policy_root.path()).unwrap();
        let engine = unreachable_engine().await;
        let pipeline = CompliancePipeline::new(registry(), &loader, &engine);

        let result = pipeline
            .evaluate(&healthy_contract(), "healthcare", ReportFormat::Json, None)
            .await
            .unwrap();

        assert!(!result.overall_compliant);
        assert_eq!(result.phase2.len(), 1);
        let message = result.phase2[0].details.get("message").and_then(Value::as_str).unwrap();
        assert!(!message.is_empty());
    }

    #[tokio::test]
    async fn zero_required_metrics_runs_every_active_evaluator() {
        let policy_root = TempDir::new("zero-metrics");
        let folder = policy_root.path().join("general/baseline");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("rules.rego"), "package general.baseline\n").unwrap();
        let loader = PolicyLoader::load(policy_root.path()).unwrap();
        let engine = unreachable_engine().await;
        let pipeline = CompliancePipeline::new(registry(), &loader, &engine);

        let contract = ContractBuilder::new("demo", ModelInfo::new("m"))
            .interaction(Interaction::new("hi", "hello there"))
            .build()
            .unwrap();

        let result = pipeline.evaluate(&contract, "baseline", ReportFormat::Json, None).await.unwrap();
        assert_eq!(result.phase1.len(), registry().all().len());
    }

    #[tokio::test]
    async fn unsupported_report_format_records_error_but_keeps_phase_results() {
        let policy_root = TempDir::new("bad-format");
        write_policy_folder(policy_root.path());
        let loader = PolicyLoader::load(policy_root.path()).unwrap();
        let engine = unreachable_engine().await;
        let pipeline = CompliancePipeline::new(registry(), &loader, &engine);

        let result = pipeline
            .evaluate(&healthy_contract(), "healthcare", ReportFormat::Pdf, None)
            .await
            .unwrap();

        assert!(result.report.is_none());
        assert!(result.report_error.is_some());
        assert!(!result.phase1.is_empty());
    }

    #[tokio::test]
    async fn output_dir_persists_report_file() {
        let policy_root = TempDir::new("output-dir");
        write_policy_folder(policy_root.path());
        let loader = PolicyLoader::load(policy_root.path()).unwrap();
        let engine = unreachable_engine().await;
        let pipeline = CompliancePipeline::new(registry(), &loader, &engine);

        let out_dir = TempDir::new("output-dir-target");
        let nested = out_dir.path().join("reports");
        let result = pipeline
            .evaluate(&healthy_contract(), "healthcare", ReportFormat::Markdown, Some(&nested))
            .await
            .unwrap();

        let path = result.report_path.expect("report should have been written");
        assert!(path.exists());
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("AI Compliance Evaluation Report"));
    }
}
