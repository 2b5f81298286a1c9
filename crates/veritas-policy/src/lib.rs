//! # veritas-policy
//!
//! Policy bundle discovery and the policy engine driver for the
//! VERITAS compliance runtime: walking a rooted directory of policy files
//! organized by regulatory category/subcategory/version, and invoking an
//! external policy decision engine — embedded subprocess or HTTP server —
//! normalizing its output into a uniform `PolicyResult`.

pub mod engine;
pub mod loader;

pub use engine::{EngineMode, EngineRunMode, PolicyEngineDriver};
pub use loader::{PolicyFile, PolicyLoader};
