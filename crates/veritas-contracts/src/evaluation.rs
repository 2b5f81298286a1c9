//! The evaluator verdict type produced by every evaluator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The uniform result every evaluator produces for a contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub evaluator_name: String,
    pub compliant: bool,
    pub score: f64,
    #[serde(default)]
    pub threshold: Option<f64>,
    pub reason: String,
    #[serde(default)]
    pub details: Map<String, Value>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl EvaluationResult {
    pub fn new(
        evaluator_name: impl Into<String>,
        compliant: bool,
        score: f64,
        threshold: Option<f64>,
        reason: impl Into<String>,
        details: Map<String, Value>,
    ) -> Self {
        Self {
            evaluator_name: evaluator_name.into(),
            compliant,
            score: score.clamp(0.0, 1.0),
            threshold,
            reason: reason.into(),
            details,
            timestamp: Utc::now(),
        }
    }

    /// The standard "unrecoverable failure" shape: an evaluator must never
    /// propagate an error across its boundary.
    pub fn error(evaluator_name: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut details = Map::new();
        details.insert("error".to_string(), Value::String(message.clone()));
        Self::new(evaluator_name, false, 0.0, None, format!("evaluation error: {message}"), details)
    }

    /// The "dependency unavailable, strict mode" shape.
    pub fn dependency_unavailable(evaluator_name: impl Into<String>, capability: impl Into<String>) -> Self {
        let capability = capability.into();
        let mut details = Map::new();
        details.insert("dependency_unavailable".to_string(), Value::Bool(true));
        details.insert("capability".to_string(), Value::String(capability.clone()));
        Self::new(
            evaluator_name,
            false,
            0.0,
            None,
            format!("required capability '{capability}' is unavailable"),
            details,
        )
    }

    /// The "no input data" / empty-result shape used by fairness and risk
    /// management when there is nothing to score.
    pub fn empty(evaluator_name: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let mut details = Map::new();
        details.insert("empty".to_string(), Value::Bool(true));
        Self::new(evaluator_name, false, 0.0, None, reason, details)
    }
}
