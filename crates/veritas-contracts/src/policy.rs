//! Normalized policy evaluation results, produced by the policy engine driver.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status of a single normalized policy result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PolicyStatus {
    Active,
    Error,
}

/// A policy evaluation result, normalized from whatever shape the policy
/// engine returned (deeply-nested `result[0].expressions[0].value...` trees,
/// or a flat `{allow, reason, recommendations}` payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyResult {
    pub policy_name: String,
    pub version: String,
    pub overall_result: bool,
    pub status: PolicyStatus,
    pub details: HashMap<String, Value>,
    pub recommendations: Vec<String>,
    pub raw: Value,
}

impl PolicyResult {
    /// Build an `Active`-status result from a normalized engine payload.
    pub fn new(
        policy_name: impl Into<String>,
        overall_result: bool,
        message: impl Into<String>,
        recommendations: Vec<String>,
        raw: Value,
    ) -> Self {
        let mut details = HashMap::new();
        details.insert("message".to_string(), Value::String(message.into()));
        Self {
            policy_name: policy_name.into(),
            version: "unknown".to_string(),
            overall_result,
            status: PolicyStatus::Active,
            details,
            recommendations,
            raw,
        }
    }

    /// Build an `Error`-status result for a policy that could not be
    /// evaluated (engine unreachable, timeout, malformed payload).
    pub fn error(policy_name: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut details = HashMap::new();
        details.insert("message".to_string(), Value::String(message.clone()));
        Self {
            policy_name: policy_name.into(),
            version: "unknown".to_string(),
            overall_result: false,
            status: PolicyStatus::Error,
            details,
            recommendations: vec![format!("investigate policy engine error: {message}")],
            raw: Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_result_has_non_empty_message() {
        let result = PolicyResult::error("eu_ai_act.fairness", "engine unreachable");
        assert_eq!(result.status, PolicyStatus::Error);
        assert!(!result.overall_result);
        let message = result.details.get("message").and_then(Value::as_str).unwrap();
        assert!(!message.is_empty());
    }

    #[test]
    fn serde_round_trip() {
        let result = PolicyResult::error("p", "m");
        let json = serde_json::to_string(&result).unwrap();
        let back: PolicyResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.policy_name, result.policy_name);
    }
}
