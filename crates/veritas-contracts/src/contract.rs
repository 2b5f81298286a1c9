//! The contract model: the immutable input record describing an AI
//! application's interactions and domain context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{VeritasError, VeritasResult};

/// Metadata describing the model under evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_name: String,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ModelInfo {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            model_version: None,
            metadata: Map::new(),
        }
    }
}

/// A single recorded input/output exchange with the AI system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(default = "Uuid::new_v4")]
    pub interaction_id: Uuid,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    pub input_text: String,
    pub output_text: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Interaction {
    pub fn new(input_text: impl Into<String>, output_text: impl Into<String>) -> Self {
        Self {
            interaction_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            input_text: input_text.into(),
            output_text: output_text.into(),
            metadata: Map::new(),
        }
    }
}

/// The canonical representation of everything submitted for compliance
/// evaluation. Constructed only through `ContractBuilder::build`, which
/// enforces the domain invariants below — there is no public struct literal,
/// so the invariant cannot be bypassed from within this crate's own API
/// surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    #[serde(default = "Uuid::new_v4")]
    pub contract_id: Uuid,
    pub application_name: String,
    pub model_info: ModelInfo,
    pub interactions: Vec<Interaction>,
    #[serde(default)]
    pub final_output: Option<String>,
    #[serde(default)]
    pub context: Map<String, Value>,
    #[serde(default)]
    pub compliance_context: Map<String, Value>,
}

impl Contract {
    /// Convenience accessor mirroring the source model's dict-like `.get`:
    /// checks `context` first, then `compliance_context`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.context.get(key).or_else(|| self.compliance_context.get(key))
    }

    pub fn domain(&self) -> Option<&str> {
        self.context.get("domain").and_then(Value::as_str)
    }

    /// Re-checks the domain invariants. `ContractBuilder::build` already
    /// runs this, but a `Contract` deserialized straight from JSON bypasses
    /// the builder, so callers that accept contracts from the wire
    /// re-validate with this before use.
    pub fn validate(&self) -> VeritasResult<()> {
        if self.application_name.trim().is_empty() {
            return Err(VeritasError::Validation {
                reason: "application_name must be non-empty".to_string(),
            });
        }
        if self.interactions.is_empty() {
            return Err(VeritasError::Validation {
                reason: "interactions must be non-empty".to_string(),
            });
        }
        match self.domain() {
            Some("healthcare") => {
                for required in ["risk_documentation", "patient_data"] {
                    if !self.context.contains_key(required) {
                        return Err(VeritasError::Validation {
                            reason: format!(
                                "domain 'healthcare' requires context.{required}"
                            ),
                        });
                    }
                }
            }
            Some("finance") => {
                for required in ["risk_documentation", "customer_data"] {
                    if !self.context.contains_key(required) {
                        return Err(VeritasError::Validation {
                            reason: format!("domain 'finance' requires context.{required}"),
                        });
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Builder enforcing the contract invariants at construction time.
#[derive(Debug, Clone)]
pub struct ContractBuilder {
    contract_id: Uuid,
    application_name: String,
    model_info: ModelInfo,
    interactions: Vec<Interaction>,
    final_output: Option<String>,
    context: Map<String, Value>,
    compliance_context: Map<String, Value>,
}

impl ContractBuilder {
    pub fn new(application_name: impl Into<String>, model_info: ModelInfo) -> Self {
        Self {
            contract_id: Uuid::new_v4(),
            application_name: application_name.into(),
            model_info,
            interactions: Vec::new(),
            final_output: None,
            context: Map::new(),
            compliance_context: Map::new(),
        }
    }

    pub fn interaction(mut self, interaction: Interaction) -> Self {
        self.interactions.push(interaction);
        self
    }

    pub fn interactions(mut self, interactions: Vec<Interaction>) -> Self {
        self.interactions.extend(interactions);
        self
    }

    pub fn final_output(mut self, final_output: impl Into<String>) -> Self {
        self.final_output = Some(final_output.into());
        self
    }

    pub fn context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn compliance_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.compliance_context.insert(key.into(), value.into());
        self
    }

    /// Validate the contract invariants and produce a `Contract`.
    pub fn build(self) -> VeritasResult<Contract> {
        let contract = Contract {
            contract_id: self.contract_id,
            application_name: self.application_name,
            model_info: self.model_info,
            interactions: self.interactions,
            final_output: self.final_output,
            context: self.context,
            compliance_context: self.compliance_context,
        };
        contract.validate()?;
        Ok(contract)
    }
}
