//! Policy engine driver: invokes an external policy decision engine,
//! either an embedded subprocess binary or a long-running HTTP server, and
//! normalizes its output into `PolicyResult`.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};
use veritas_contracts::error::{VeritasError, VeritasResult};
use veritas_contracts::policy::PolicyResult;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Which execution mode the driver was constructed with.
pub enum EngineMode {
    /// Invokes a locally installed policy decision binary via subprocess,
    /// once per query.
    Embedded { binary_path: PathBuf },
    /// POSTs JSON to a long-running policy HTTP endpoint.
    Server { base_url: String, client: reqwest::Client },
}

/// Whether normalization should request `development` (richer detail) or
/// `production` output from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineRunMode {
    Development,
    Production,
}

pub struct PolicyEngineDriver {
    mode: EngineMode,
    run_mode: EngineRunMode,
    reachable: bool,
}

impl PolicyEngineDriver {
    /// Constructs an embedded-mode driver. `skip_opa_check` mirrors the CI
    /// environment flag: when set, the reachability check is skipped and
    /// the engine is assumed present.
    pub async fn embedded(binary_path: PathBuf, run_mode: EngineRunMode, skip_opa_check: bool) -> Self {
        let reachable = skip_opa_check || binary_path.is_file();
        if !reachable {
            warn!(path = %binary_path.display(), "policy engine binary not found");
        }
        Self {
            mode: EngineMode::Embedded { binary_path },
            run_mode,
            reachable,
        }
    }

    /// Constructs a server-mode driver, checking `{base_url}/health` unless
    /// `skip_opa_check` is set.
    pub async fn server(base_url: String, run_mode: EngineRunMode, skip_opa_check: bool) -> Self {
        let client = reqwest::Client::new();
        let reachable = if skip_opa_check {
            true
        } else {
            match client.get(format!("{base_url}/health")).send().await {
                Ok(response) => response.status().is_success(),
                Err(error) => {
                    warn!(%error, base_url, "policy engine health check failed");
                    false
                }
            }
        };
        Self {
            mode: EngineMode::Server { base_url, client },
            run_mode,
            reachable,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    /// Main entry point: evaluates one policy category against
    /// `input_data`, returning a normalized result. Never returns `Err` —
    /// engine failures are normalized into an `Error`-status `PolicyResult`
    /// instead, and never bubble up to the pipeline.
    pub async fn evaluate_policy_category(
        &self,
        category_selector: &str,
        input_data: &Value,
        custom_params: Option<&Value>,
    ) -> PolicyResult {
        if !self.reachable {
            return PolicyResult::error(category_selector, "policy engine unavailable");
        }

        let input = json!({
            "input": {
                "contract": input_data.get("contract"),
                "evaluation": input_data.get("evaluation"),
                "mode": if self.run_mode == EngineRunMode::Development { "development" } else { "production" },
                "custom_params": custom_params,
            }
        });

        let raw = match timeout(DEFAULT_REQUEST_TIMEOUT, self.invoke(category_selector, &input)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(error)) => {
                warn!(%error, category_selector, "policy engine invocation failed");
                return PolicyResult::error(category_selector, format!("policy engine error: {error}"));
            }
            Err(_) => {
                warn!(category_selector, "policy engine invocation timed out");
                return PolicyResult::error(category_selector, "policy engine request timed out");
            }
        };

        normalize(category_selector, &raw)
    }

    async fn invoke(&self, category_selector: &str, input: &Value) -> VeritasResult<Value> {
        match &self.mode {
            EngineMode::Embedded { binary_path } => {
                let mut command = Command::new(binary_path);
                command
                    .arg("eval")
                    .arg("--format=json")
                    .arg(format!("--data={category_selector}"))
                    .arg("--stdin-input")
                    .stdin(Stdio::piped())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());

                let mut child = command.spawn().map_err(|e| VeritasError::PolicyEngine {
                    reason: format!("failed to spawn policy engine binary: {e}"),
                })?;

                if let Some(mut stdin) = child.stdin.take() {
                    use tokio::io::AsyncWriteExt;
                    let payload = serde_json::to_vec(input).map_err(|e| VeritasError::PolicyEngine {
                        reason: format!("failed to serialize policy input: {e}"),
                    })?;
                    stdin.write_all(&payload).await.map_err(|e| VeritasError::PolicyEngine {
                        reason: format!("failed to write policy input: {e}"),
                    })?;
                }

                let output = child.wait_with_output().await.map_err(|e| VeritasError::PolicyEngine {
                    reason: format!("policy engine process failed: {e}"),
                })?;

                if !output.status.success() {
                    return Err(VeritasError::PolicyEngine {
                        reason: format!(
                            "policy engine exited with {}: {}",
                            output.status,
                            String::from_utf8_lossy(&output.stderr)
                        ),
                    });
                }

                serde_json::from_slice(&output.stdout).map_err(|e| VeritasError::PolicyEngine {
                    reason: format!("policy engine produced non-JSON output: {e}"),
                })
            }
            EngineMode::Server { base_url, client } => {
                let package_path = category_selector.trim_start_matches("data.").replace('.', "/");
                let url = format!("{base_url}/v1/data/{package_path}");
                let response = client.post(&url).json(input).send().await.map_err(|e| VeritasError::PolicyEngine {
                    reason: format!("policy engine request failed: {e}"),
                })?;

                if !response.status().is_success() {
                    return Err(VeritasError::PolicyEngine {
                        reason: format!("policy engine returned status {}", response.status()),
                    });
                }

                response.json::<Value>().await.map_err(|e| VeritasError::PolicyEngine {
                    reason: format!("policy engine returned non-JSON body: {e}"),
                })
            }
        }
    }
}

/// Normalizes raw engine output into the uniform `PolicyResult` shape.
/// Handles both a full `compliance_report` sub-object and a flat
/// `{allow, reason, recommendations}` payload, synthesizing the former from
/// the latter when necessary.
fn normalize(policy_name: &str, raw: &Value) -> PolicyResult {
    let value = raw
        .pointer("/result/0/expressions/0/value")
        .or_else(|| raw.get("result"))
        .unwrap_or(raw);

    let compliance_report = value.get("compliance_report").cloned().unwrap_or_else(|| {
        json!({
            "overall_result": value.get("allow").and_then(Value::as_bool).unwrap_or(false),
            "message": value.get("reason").and_then(Value::as_str).unwrap_or("no reason provided"),
            "recommendations": value.get("recommendations").cloned().unwrap_or_else(|| json!([])),
        })
    });

    let overall_result = compliance_report.get("overall_result").and_then(Value::as_bool).unwrap_or(false);
    let message = compliance_report
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("no reason provided")
        .to_string();
    let recommendations: Vec<String> = compliance_report
        .get("recommendations")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    info!(policy_name, overall_result, "normalized policy engine result");

    PolicyResult::new(policy_name, overall_result, message, recommendations, raw.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_flat_allow_payload_into_compliance_report() {
        let raw = json!({"allow": true, "reason": "all checks passed", "recommendations": []});
        let result = normalize("fairness", &raw);
        assert!(result.overall_result);
        assert_eq!(result.details.get("message").unwrap(), "all checks passed");
    }

    #[test]
    fn normalizes_nested_opa_style_result_with_compliance_report() {
        let raw = json!({
            "result": [{
                "expressions": [{
                    "value": {
                        "v1": {
                            "fairness": {
                                "compliance_report": {
                                    "overall_result": false,
                                    "message": "fairness score below threshold",
                                    "recommendations": ["retrain with balanced data"],
                                }
                            }
                        }
                    }
                }]
            }]
        });
        // Engines that nest per-version/per-policy trees still surface a
        // `compliance_report` once the caller descends to the right node;
        // here we normalize the leaf directly.
        let leaf = raw.pointer("/result/0/expressions/0/value/v1/fairness").unwrap();
        let result = normalize("fairness", leaf);
        assert!(!result.overall_result);
        assert_eq!(result.recommendations, vec!["retrain with balanced data".to_string()]);
    }

    #[tokio::test]
    async fn unreachable_engine_returns_error_status_without_panicking() {
        let driver = PolicyEngineDriver::embedded(PathBuf::from("/nonexistent/opa-binary"), EngineRunMode::Production, false).await;
        assert!(!driver.is_reachable());
        let result = driver.evaluate_policy_category("fairness", &json!({}), None).await;
        assert!(!result.overall_result);
    }
}
