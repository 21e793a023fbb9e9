use chrono::{DateTime, Utc};
use memos_core::{MemoryId, OrganizationId, Scope, TraceId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRunStatus {
    Success,
    Retry,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentName {
    Classification,
    Metadata,
    Topic,
    Pattern,
    GraphLinking,
    PatternDetection,
    FeedbackLearning,
    LogseqExport,
}

impl AgentName {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentName::Classification => "classification",
            AgentName::Metadata => "metadata",
            AgentName::Topic => "topic",
            AgentName::Pattern => "pattern",
            AgentName::GraphLinking => "graph_linking",
            AgentName::PatternDetection => "pattern_detection",
            AgentName::FeedbackLearning => "feedback_learning",
            AgentName::LogseqExport => "logseq_export",
        }
    }
}

/// One agent's output for a given memory (§4.3 Agent contract).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub status: AgentRunStatus,
    pub confidence: f64,
    pub outputs: HashMap<String, Value>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub provenance: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRun {
    pub organization_id: OrganizationId,
    pub memory_id: MemoryId,
    pub agent_name: String,
    pub agent_version: String,
    pub inputs_hash: String,
    pub status: AgentRunStatus,
    pub confidence: f64,
    pub outputs: HashMap<String, Value>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub trace_id: TraceId,
    pub provenance: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentRunEvent {
    pub organization_id: OrganizationId,
    pub memory_id: MemoryId,
    pub agent_name: String,
    pub step_index: u32,
    pub event_type: String,
    pub summary_text: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedAgentOutput {
    pub outputs: HashMap<String, Value>,
    pub confidence: f64,
    pub expires_at: DateTime<Utc>,
}

/// The inputs a run is computed from (§4.3 step 2-4), independent of how
/// they're sourced (short-term cache tier vs long-term storage).
pub struct AgentRunInputs {
    pub organization_id: OrganizationId,
    pub memory_id: MemoryId,
    pub storage_tier: String,
    pub content: String,
    pub classification: String,
    pub scope: Scope,
    pub scope_id: Option<uuid::Uuid>,
    pub prior_enrichment: Value,
    /// `"<pending_count>:<max_created_at>"`, only non-empty for FeedbackLearning.
    pub feedback_fingerprint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStrategy {
    Deterministic,
    Llm,
}
