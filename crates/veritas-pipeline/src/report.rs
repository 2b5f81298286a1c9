//! Combined report projection: phase-1 evaluator results plus
//! phase-2 normalized policy results, folded into one JSON or Markdown
//! report. PDF/HTML remain thin pass-throughs out of scope, matching
//! `veritas_core::orchestrator::ComplianceEvaluator::project_report`.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use veritas_contracts::error::{VeritasError, VeritasResult};
use veritas_contracts::evaluation::EvaluationResult;
use veritas_contracts::policy::PolicyResult;
use veritas_contracts::report::{Report, ReportFormat};

pub fn project_combined_report(
    phase1: &BTreeMap<String, EvaluationResult>,
    phase2: &[PolicyResult],
    overall_compliant: bool,
    format: ReportFormat,
) -> VeritasResult<Report> {
    match format {
        ReportFormat::Json => Ok(Report::new(project_json(phase1, phase2, overall_compliant), ReportFormat::Json)),
        ReportFormat::Markdown => {
            Ok(Report::new(project_markdown(phase1, phase2, overall_compliant), ReportFormat::Markdown))
        }
        ReportFormat::Pdf | ReportFormat::Html => Err(VeritasError::ReportGeneration {
            reason: format!("{format:?} report rendering is out of scope for the core"),
        }),
    }
}

fn project_json(
    phase1: &BTreeMap<String, EvaluationResult>,
    phase2: &[PolicyResult],
    overall_compliant: bool,
) -> String {
    let evaluation_results: Map<String, Value> = phase1
        .iter()
        .map(|(name, result)| (name.clone(), serde_json::to_value(result).unwrap_or(Value::Null)))
        .collect();
    let policy_results: Vec<Value> = phase2
        .iter()
        .map(|result| serde_json::to_value(result).unwrap_or(Value::Null))
        .collect();
    let body = json!({
        "evaluation_results": evaluation_results,
        "policy_results": policy_results,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "overall_compliant": overall_compliant,
    });
    serde_json::to_string_pretty(&body).unwrap_or_else(|_| "{}".to_string())
}

fn project_markdown(
    phase1: &BTreeMap<String, EvaluationResult>,
    phase2: &[PolicyResult],
    overall_compliant: bool,
) -> String {
    let mut out = String::new();
    out.push_str("# AI Compliance Evaluation Report\n\n");
    out.push_str(&format!(
        "## Overall Compliance: {}\n\n",
        if overall_compliant { "PASS" } else { "FAIL" }
    ));

    out.push_str("| Evaluator | Compliance | Score | Threshold |\n");
    out.push_str("|---|---|---|---|\n");
    for (name, result) in phase1 {
        let threshold = result.threshold.map(|t| format!("{t:.2}")).unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "| {} | {} | {:.2} | {} |\n",
            name,
            if result.compliant { "PASS" } else { "FAIL" },
            result.score,
            threshold
        ));
    }
    out.push('\n');

    for (name, result) in phase1 {
        out.push_str(&format!("## {name}\n\n"));
        out.push_str(&format!("- Compliance: {}\n", if result.compliant { "PASS" } else { "FAIL" }));
        out.push_str(&format!("- Score: {:.2}\n", result.score));
        if let Some(threshold) = result.threshold {
            out.push_str(&format!("- Threshold: {threshold:.2}\n"));
        }
        out.push_str(&format!("- Reason: {}\n\n", result.reason));
        out.push_str("```json\n");
        out.push_str(&serde_json::to_string_pretty(&result.details).unwrap_or_else(|_| "{}".to_string()));
        out.push_str("\n```\n\n");
    }

    out.push_str("## Policy Results\n\n");
    if phase2.is_empty() {
        out.push_str("_No policy folders were evaluated._\n\n");
    }
    for result in phase2 {
        out.push_str(&format!("### {} ({:?})\n\n", result.policy_name, result.status));
        out.push_str(&format!(
            "- Result: {}\n",
            if result.overall_result { "PASS" } else { "FAIL" }
        ));
        out.push_str("```json\n");
        out.push_str(&serde_json::to_string_pretty(&result.details).unwrap_or_else(|_| "{}".to_string()));
        out.push_str("\n```\n\n");
        if !result.recommendations.is_empty() {
            out.push_str("Recommendations:\n\n");
            for recommendation in &result.recommendations {
                out.push_str(&format!("- {recommendation}\n"));
            }
            out.push('\n');
        }
    }

    out
}
