use chrono::{DateTime, Utc};
use memos_core::{MemoryId, UserId};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Balanced,
    Performance,
    Research,
}

impl SearchMode {
    pub fn half_life_days(&self) -> f64 {
        match self {
            SearchMode::Performance => 7.0,
            SearchMode::Balanced => 30.0,
            SearchMode::Research => 90.0,
        }
    }
}

/// Scope/episode/goal affinity discrete scores (§4.2 `ctx` component).
#[derive(Debug, Clone, Copy)]
pub enum Affinity {
    ExactMatch,
    BroaderScope,
    Adjacent,
    Unrelated,
}

impl Affinity {
    pub fn value(self) -> f64 {
        match self {
            Affinity::ExactMatch => 1.0,
            Affinity::BroaderScope => 0.7,
            Affinity::Adjacent => 0.6,
            Affinity::Unrelated => 0.3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContextAffinities {
    pub scope_match: Option<Affinity>,
    pub episode_match: Option<Affinity>,
    pub goal_match: Option<Affinity>,
}

impl ContextAffinities {
    pub fn mean(&self) -> f64 {
        let values: Vec<f64> = [self.scope_match, self.episode_match, self.goal_match]
            .into_iter()
            .flatten()
            .map(Affinity::value)
            .collect();
        if values.is_empty() {
            Affinity::Unrelated.value()
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ActivationComponents {
    pub rel: f64,
    pub rec: f64,
    pub freq: f64,
    pub imp: f64,
    pub conf: f64,
    pub ctx: f64,
    pub prov: f64,
    pub risk: f64,
    pub nbr: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatingInfo {
    pub allowed: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResultExplanation {
    pub memory_id: MemoryId,
    pub activation: f64,
    pub components: ActivationComponents,
    pub gating: GatingInfo,
    pub rank: usize,
}

/// Append-only per-request explanation row (§3).
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalExplanation {
    pub id: uuid::Uuid,
    pub organization_id: uuid::Uuid,
    pub query_hash: String,
    pub user_id: UserId,
    pub retrieved_at: DateTime<Utc>,
    pub top_k: usize,
    pub results: Vec<RetrievalResultExplanation>,
}

/// Citation-ready provenance envelope attached to every returned memory
/// (§4.2 Provenance attachment).
#[derive(Debug, Clone, Serialize)]
pub struct ProvenanceRecord {
    pub kind: String,
    pub source_type: String,
    pub source_id: MemoryId,
    pub source_version: String,
    pub content_hash: String,
    pub title: String,
    pub excerpt: String,
    pub score: f64,
    pub meta: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrievedMemory {
    pub memory: memos_store::Memory,
    pub activation: f64,
    pub hybrid_raw: f64,
    pub components: ActivationComponents,
    pub provenance: ProvenanceRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackSignal {
    Positive,
    Negative,
}

#[derive(Debug, Clone)]
pub struct RelevanceFeedback {
    pub memory_id: MemoryId,
    pub user_id: UserId,
    pub signal: FeedbackSignal,
    pub recorded_at: DateTime<Utc>,
}

pub struct SearchRequest {
    pub query: String,
    pub query_embedding: Option<Vec<f32>>,
    pub top_k: usize,
    pub hybrid: bool,
    pub mode: SearchMode,
    pub scope: Option<memos_core::Scope>,
    pub context: ContextAffinities,
}
