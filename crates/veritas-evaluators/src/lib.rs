//! # veritas-evaluators
//!
//! The ten concrete compliance evaluators built on top of the
//! `Evaluator` trait and `CriterionJudge` capability contract from
//! `veritas-core`: fairness, content safety, risk management, accuracy, the
//! five shared-core EU AI Act "prohibited practices" detectors (biometric
//! categorization, manipulation, vulnerability exploitation, social
//! scoring, emotion recognition), and documentation / model card.

pub mod accuracy;
pub mod content_safety;
pub mod detectors;
pub mod fairness;
pub mod model_card;
pub mod risk_management;

pub use accuracy::AccuracyEvaluator;
pub use content_safety::ContentSafetyEvaluator;
pub use detectors::{Combinator, DetectorEvaluator, ScoreCombinator};
pub use fairness::FairnessEvaluator;
pub use model_card::ModelCardEvaluator;
pub use risk_management::RiskManagementEvaluator;

use std::sync::Arc;

use veritas_core::judge::PatternJudge;
use veritas_core::registry::EvaluatorRegistry;

fn biometric_categorization() -> Box<dyn veritas_core::Evaluator> {
    Box::new(DetectorEvaluator::new(
        "biometric_categorization",
        "biometric_categorization",
        &[
            "biometric_categorization",
            "gender_categorization",
            "ethnicity_categorization",
            "age_categorization",
            "disability_categorization",
        ],
        Combinator::NoneDetected,
        ScoreCombinator::Mean,
        Arc::new(PatternJudge),
    ))
}

fn manipulation() -> Box<dyn veritas_core::Evaluator> {
    Box::new(DetectorEvaluator::new(
        "manipulation",
        "manipulation",
        &["manipulation", "deception", "toxicity"],
        Combinator::NoneDetected,
        ScoreCombinator::Min,
        Arc::new(PatternJudge),
    ))
}

fn vulnerability_exploitation() -> Box<dyn veritas_core::Evaluator> {
    Box::new(DetectorEvaluator::new(
        "vulnerability_exploitation",
        "vulnerability_exploitation",
        &["age_vulnerability", "disability_vulnerability", "socioeconomic_vulnerability"],
        Combinator::NoneDetected,
        ScoreCombinator::Mean,
        Arc::new(PatternJudge),
    ))
}

fn social_scoring() -> Box<dyn veritas_core::Evaluator> {
    Box::new(DetectorEvaluator::new(
        "social_scoring",
        "social_scoring",
        &["social_scoring", "detrimental_treatment"],
        Combinator::NotAllDetected,
        ScoreCombinator::Mean,
        Arc::new(PatternJudge),
    ))
}

fn emotion_recognition() -> Box<dyn veritas_core::Evaluator> {
    Box::new(DetectorEvaluator::new(
        "emotion_recognition",
        "emotion_recognition",
        &["emotion_recognition", "workplace_context", "educational_context"],
        Combinator::AbsentOrOutsideContext,
        ScoreCombinator::Mean,
        Arc::new(PatternJudge),
    ))
}

/// Registers every built-in evaluator with `registry`. Passed to
/// `veritas_core::registry::initialize_once` at process start.
pub fn register_builtins(registry: &mut EvaluatorRegistry) {
    registry.register("fairness", || Box::new(FairnessEvaluator::default()));
    registry.register("content_safety", || Box::new(ContentSafetyEvaluator::default()));
    registry.register("risk_management", || Box::new(RiskManagementEvaluator::default()));
    registry.register("accuracy", || Box::new(AccuracyEvaluator::default()));
    registry.register("biometric_categorization", biometric_categorization);
    registry.register("manipulation", manipulation);
    registry.register("vulnerability_exploitation", vulnerability_exploitation);
    registry.register("social_scoring", social_scoring);
    registry.register("emotion_recognition", emotion_recognition);
    registry.register("model_card", || Box::new(ModelCardEvaluator::default()));
}
