//! Documentation / model card evaluator.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use veritas_contracts::config::EvaluatorConfig;
use veritas_contracts::contract::Contract;
use veritas_contracts::error::VeritasResult;
use veritas_contracts::evaluation::EvaluationResult;
use veritas_core::evaluator::Evaluator;

struct SectionSpec {
    name: &'static str,
    weight: f64,
    subsections: &'static [&'static str],
    eu_ai_act_reference: &'static str,
}

/// Nine required model-card sections, each tied to the corresponding
/// EU AI Act Annex IV documentation item. Weights are
/// documented heuristic defaults, overridable via `section_weights`.
const SECTIONS: &[SectionSpec] = &[
    SectionSpec {
        name: "model_details",
        weight: 0.15,
        subsections: &["developer", "version", "model_type", "training_details"],
        eu_ai_act_reference: "Annex IV(1): general description of the AI system",
    },
    SectionSpec {
        name: "intended_use",
        weight: 0.12,
        subsections: &["primary_uses", "primary_users", "out_of_scope_uses"],
        eu_ai_act_reference: "Annex IV(2): intended purpose",
    },
    SectionSpec {
        name: "factors",
        weight: 0.08,
        subsections: &["relevant_factors", "evaluation_factors"],
        eu_ai_act_reference: "Annex IV(3): elements relevant to compliance assessment",
    },
    SectionSpec {
        name: "metrics",
        weight: 0.12,
        subsections: &["performance_measures", "decision_thresholds"],
        eu_ai_act_reference: "Annex IV(4): performance metrics",
    },
    SectionSpec {
        name: "evaluation_data",
        weight: 0.1,
        subsections: &["datasets", "motivation", "preprocessing"],
        eu_ai_act_reference: "Annex IV(5): testing and validation data",
    },
    SectionSpec {
        name: "training_data",
        weight: 0.1,
        subsections: &["datasets", "motivation"],
        eu_ai_act_reference: "Annex IV(6): training data description",
    },
    SectionSpec {
        name: "quantitative_analyses",
        weight: 0.11,
        subsections: &["unitary_results", "intersectional_results"],
        eu_ai_act_reference: "Annex IV(7): accuracy metrics across relevant subgroups",
    },
    SectionSpec {
        name: "ethical_considerations",
        weight: 0.12,
        subsections: &["sensitive_data", "risks_and_harms", "mitigations"],
        eu_ai_act_reference: "Annex IV(8): risk management measures",
    },
    SectionSpec {
        name: "caveats_recommendations",
        weight: 0.1,
        subsections: &["caveats", "recommendations"],
        eu_ai_act_reference: "Annex IV(9): instructions for use",
    },
];

/// Content-length-derived quality tiers: missing / minimal / partial /
/// comprehensive → 0.0 / 0.3 / 0.7 / 1.0.
fn subsection_quality(content: Option<&str>) -> f64 {
    match content.map(str::trim) {
        None | Some("") => 0.0,
        Some(text) if text.len() < 50 => 0.3,
        Some(text) if text.len() < 200 => 0.7,
        Some(_) => 1.0,
    }
}

fn section_score(section: &SectionSpec, section_value: Option<&Value>) -> (f64, bool) {
    let Some(section_value) = section_value.and_then(Value::as_object) else {
        return (0.0, true);
    };
    let scores: Vec<f64> = section
        .subsections
        .iter()
        .map(|sub| subsection_quality(section_value.get(*sub).and_then(Value::as_str)))
        .collect();
    let score = scores.iter().sum::<f64>() / scores.len() as f64;
    (score, false)
}

pub struct ModelCardEvaluator {
    config: EvaluatorConfig,
}

impl Default for ModelCardEvaluator {
    fn default() -> Self {
        Self {
            config: Self::static_default_config(),
        }
    }
}

impl ModelCardEvaluator {
    fn static_default_config() -> EvaluatorConfig {
        EvaluatorConfig::new(0.7)
    }

    fn weight_for(&self, section_name: &str, default_weight: f64) -> f64 {
        self.config
            .extras
            .get("section_weights")
            .and_then(Value::as_object)
            .and_then(|weights| weights.get(section_name))
            .and_then(Value::as_f64)
            .unwrap_or(default_weight)
    }
}

#[async_trait]
impl Evaluator for ModelCardEvaluator {
    fn name(&self) -> &str {
        "model_card"
    }

    fn supported_metrics(&self) -> BTreeSet<String> {
        BTreeSet::from(["model_card.score".to_string()])
    }

    fn default_config(&self) -> EvaluatorConfig {
        Self::static_default_config()
    }

    async fn initialize(&mut self, config: EvaluatorConfig) -> VeritasResult<()> {
        self.config = config;
        Ok(())
    }

    async fn evaluate_async(&self, contract: &Contract) -> EvaluationResult {
        let model_card = contract.get("model_card");
        if model_card.is_none() {
            return EvaluationResult::empty("model_card", "no model_card supplied");
        }
        let model_card_obj = model_card.and_then(Value::as_object);

        let mut missing_sections = Vec::new();
        let mut section_details = Map::new();
        let mut overall = 0.0;

        for section in SECTIONS {
            let section_value = model_card_obj.and_then(|obj| obj.get(section.name));
            let (score, missing) = section_score(section, section_value);
            if missing {
                missing_sections.push(section.name.to_string());
            }
            let weight = self.weight_for(section.name, section.weight);
            overall += weight * score;
            section_details.insert(
                section.name.to_string(),
                json!({
                    "score": score,
                    "weight": weight,
                    "missing": missing,
                    "eu_ai_act_reference": section.eu_ai_act_reference,
                }),
            );
        }

        let compliant = overall >= self.config.threshold;
        let mut details = Map::new();
        details.insert("sections".to_string(), Value::Object(section_details));
        details.insert("missing_sections".to_string(), json!(missing_sections));

        let reason = if compliant {
            format!("model card score {overall:.2} meets threshold {:.2}", self.config.threshold)
        } else {
            format!(
                "model card score {overall:.2} below threshold {:.2}, missing sections: {}",
                self.config.threshold,
                missing_sections.join(", ")
            )
        };

        EvaluationResult::new("model_card", compliant, overall, Some(self.config.threshold), reason, details)
    }
}
