//! Runtime error types for the VERITAS compliance pipeline.
//!
//! All fallible operations in the VERITAS pipeline return `VeritasResult<T>`.
//! Only `Validation`, `NoMatchingPolicy`, and `ReportGeneration` are ever
//! propagated to a caller; every other variant is caught at its layer and
//! converted into a diagnostic field on an `EvaluationResult` or
//! `PolicyResult` instead (see `veritas-core` and `veritas-policy`).

use thiserror::Error;

/// The unified error type for the VERITAS runtime.
#[derive(Debug, Error)]
pub enum VeritasError {
    /// A contract violates one of the invariants in the data model (empty
    /// interactions, missing domain-specific context, etc).
    #[error("contract validation failed: {reason}")]
    Validation { reason: String },

    /// An evaluator's required external capability (an LLM judge, a
    /// third-party scoring library) is unavailable and mock-fallback is
    /// disabled for that evaluator.
    #[error("dependency unavailable for evaluator '{evaluator}': {capability}")]
    DependencyUnavailable { evaluator: String, capability: String },

    /// An evaluator raised an unexpected error while running.
    #[error("evaluator '{evaluator}' failed internally: {message}")]
    EvaluatorInternal { evaluator: String, message: String },

    /// The policy engine was unreachable, timed out, or returned a payload
    /// that could not be normalized.
    #[error("policy engine error: {reason}")]
    PolicyEngine { reason: String },

    /// A policy-folder selector matched no folders under the loaded root.
    #[error("no policy folder matched selector '{selector}'")]
    NoMatchingPolicy { selector: String },

    /// Report projection failed (unsupported format, serialization error).
    #[error("report generation failed: {reason}")]
    ReportGeneration { reason: String },

    /// Malformed evaluator configuration or policy sidecar metadata.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

/// Convenience alias used throughout the VERITAS crates.
pub type VeritasResult<T> = Result<T, VeritasError>;
