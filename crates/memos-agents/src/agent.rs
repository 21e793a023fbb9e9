//! The `Agent` contract (§4.3): stateless, deterministic given
//! `(content, prior_enrichment, feedback fingerprint)`.

use crate::model::{AgentResult, AgentRunInputs};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("output validation failed: {0}")]
    Validation(String),
    #[error("agent execution failed: {0}")]
    Execution(String),
}

#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &'static str;
    fn version(&self) -> &'static str;

    async fn run(&self, inputs: &AgentRunInputs) -> Result<AgentResult, AgentError>;

    /// Structural validation of `run`'s output, separate from execution so
    /// a bad shape is a `failed` run (no retry) rather than an execution
    /// error (retry).
    fn validate_outputs(&self, result: &AgentResult) -> Result<(), AgentError>;
}
