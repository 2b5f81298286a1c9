//! Risk management documentation evaluator.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Map, Value};
use veritas_contracts::config::EvaluatorConfig;
use veritas_contracts::contract::Contract;
use veritas_contracts::error::VeritasResult;
use veritas_contracts::evaluation::EvaluationResult;
use veritas_core::evaluator::Evaluator;

struct SectionSpec {
    name: &'static str,
    weight: f64,
    keywords: &'static [&'static str],
    required_elements: &'static [&'static str],
}

const SECTIONS: &[SectionSpec] = &[
    SectionSpec {
        name: "risk_assessment",
        weight: 0.4,
        keywords: &[
            "risk", "hazard", "danger", "threat", "vulnerability", "likelihood", "impact",
            "severity", "probability",
        ],
        required_elements: &["identification", "classification", "severity", "probability"],
    },
    SectionSpec {
        name: "mitigation_measures",
        weight: 0.3,
        keywords: &[
            "mitigation", "control", "safeguard", "prevention", "reduce", "minimize",
            "countermeasure",
        ],
        required_elements: &["control measures", "implementation", "responsibility", "timeline"],
    },
    SectionSpec {
        name: "monitoring_system",
        weight: 0.3,
        keywords: &["monitor", "track", "audit", "review", "report", "alert", "detect"],
        required_elements: &["metrics", "indicators", "frequency", "reporting"],
    },
];

fn risk_sentence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)[^\n.!?]*(?:risk|hazard|danger|safety|mitigation|monitoring)[^\n.!?]*[.!?]")
            .expect("static risk-sentence pattern must compile")
    })
}

fn whole_word_present(text: &str, term: &str) -> bool {
    let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(term))).expect("term pattern compiles");
    pattern.is_match(text)
}

fn coverage(text: &str, terms: &[&str]) -> f64 {
    if terms.is_empty() {
        return 1.0;
    }
    let present = terms.iter().filter(|term| whole_word_present(text, term)).count();
    present as f64 / terms.len() as f64
}

fn evaluate_section(text: &str, section: &SectionSpec) -> (f64, f64, f64) {
    let keyword_coverage = coverage(text, section.keywords);
    let element_coverage = coverage(text, section.required_elements);
    let score = element_coverage * 0.6 + keyword_coverage * 0.4;
    (score, keyword_coverage, element_coverage)
}

/// Reconstructs risk documentation from interaction outputs when the
/// contract has no explicit `context.risk_documentation` field: every
/// sentence mentioning risk/hazard/danger/safety/mitigation/monitoring is
/// concatenated.
fn extract_risk_info_from_interactions(contract: &Contract) -> String {
    let pattern = risk_sentence_pattern();
    contract
        .interactions
        .iter()
        .flat_map(|interaction| pattern.find_iter(&interaction.output_text))
        .map(|m| m.as_str().trim().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct RiskManagementEvaluator {
    config: EvaluatorConfig,
}

impl Default for RiskManagementEvaluator {
    fn default() -> Self {
        Self {
            config: Self::static_default_config(),
        }
    }
}

impl RiskManagementEvaluator {
    fn static_default_config() -> EvaluatorConfig {
        EvaluatorConfig::new(0.7)
    }
}

#[async_trait]
impl Evaluator for RiskManagementEvaluator {
    fn name(&self) -> &str {
        "risk_management"
    }

    fn supported_metrics(&self) -> BTreeSet<String> {
        BTreeSet::from(["risk_management.score".to_string()])
    }

    fn default_config(&self) -> EvaluatorConfig {
        Self::static_default_config()
    }

    async fn initialize(&mut self, config: EvaluatorConfig) -> VeritasResult<()> {
        self.config = config;
        Ok(())
    }

    async fn evaluate_async(&self, contract: &Contract) -> EvaluationResult {
        let documentation = contract
            .get("risk_documentation")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| extract_risk_info_from_interactions(contract));

        if documentation.trim().is_empty() {
            return EvaluationResult::empty("risk_management", "no risk documentation available");
        }

        let mut section_details = Map::new();
        let mut overall = 0.0;
        for section in SECTIONS {
            let (score, keyword_coverage, element_coverage) = evaluate_section(&documentation, section);
            overall += section.weight * score;
            section_details.insert(
                section.name.to_string(),
                json!({
                    "score": score,
                    "keyword_coverage": keyword_coverage,
                    "element_coverage": element_coverage,
                    "weight": section.weight,
                }),
            );
        }

        let compliant = overall >= self.config.threshold;
        let mut details = Map::new();
        details.insert("sections".to_string(), Value::Object(section_details));
        details.insert("documentation_length".to_string(), json!(documentation.len()));

        let reason = if compliant {
            format!("risk documentation score {overall:.2} meets threshold {:.2}", self.config.threshold)
        } else {
            format!("risk documentation score {overall:.2} below threshold {:.2}", self.config.threshold)
        };

        EvaluationResult::new("risk_management", compliant, overall, Some(self.config.threshold), reason, details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veritas_contracts::contract::{ContractBuilder, Interaction, ModelInfo};

    #[tokio::test]
    async fn missing_documentation_is_empty_result() {
        let evaluator = RiskManagementEvaluator::default();
        let contract = ContractBuilder::new("demo", ModelInfo::new("m"))
            .interaction(Interaction::new("q", "a perfectly ordinary answer"))
            .build()
            .unwrap();
        let result = evaluator.evaluate_async(&contract).await;
        assert!(!result.compliant);
        assert_eq!(result.details.get("empty"), Some(&Value::Bool(true)));
    }

    #[tokio::test]
    async fn comprehensive_documentation_is_compliant() {
        let evaluator = RiskManagementEvaluator::default();
        let documentation = "Risk identification and classification determined severity and probability \
            for each hazard. Mitigation measures include control measures, implementation steps, \
            assigned responsibility, and a timeline. The monitoring system tracks metrics and \
            indicators, with a reporting frequency reviewed by audit.";
        let contract = ContractBuilder::new("demo", ModelInfo::new("m"))
            .interaction(Interaction::new("q", "a"))
            .context("risk_documentation", documentation)
            .build()
            .unwrap();
        let result = evaluator.evaluate_async(&contract).await;
        assert!(result.compliant);
    }

    #[tokio::test]
    async fn reconstructs_documentation_from_interactions_when_absent() {
        let evaluator = RiskManagementEvaluator::default();
        let contract = ContractBuilder::new("demo", ModelInfo::new("m"))
            .interaction(Interaction::new(
                "q",
                "There is a safety risk here. Unrelated filler sentence. We apply mitigation controls.",
            ))
            .build()
            .unwrap();
        let result = evaluator.evaluate_async(&contract).await;
        assert!(result.details.get("documentation_length").unwrap().as_u64().unwrap() > 0);
    }

    #[test]
    fn whole_word_match_does_not_match_substrings() {
        assert!(!whole_word_present("classification system", "class"));
        assert!(whole_word_present("the classification system", "classification"));
    }
}
