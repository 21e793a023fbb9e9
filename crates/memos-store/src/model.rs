use chrono::{DateTime, Utc};
use memos_core::{MemoryId, OrganizationId, Scope, UserId};
use memos_permission::MemoryFacts;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    ShortTerm,
    LongTerm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Public,
    Internal,
    Confidential,
    Restricted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: MemoryId,
    pub organization_id: OrganizationId,
    pub owner_user_id: UserId,
    pub scope: Scope,
    pub scope_id: Option<Uuid>,
    pub memory_type: MemoryType,
    pub classification: Classification,
    pub required_clearance: i32,
    pub title: String,
    pub content_preview: String,
    pub content_hash: String,
    pub tags: Vec<String>,
    pub entities: HashMap<String, Vec<String>>,
    pub metadata: serde_json::Value,
    pub source_type: String,
    pub vector_id: Option<String>,
    pub embedding_model: Option<String>,
    pub is_active: bool,
    pub legal_hold: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub access_count: i64,
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl MemoryFacts for Memory {
    fn id(&self) -> MemoryId {
        self.id
    }
    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
    fn is_active(&self) -> bool {
        self.is_active
    }
    fn required_clearance(&self) -> i32 {
        self.required_clearance
    }
    fn owner_user_id(&self) -> UserId {
        self.owner_user_id
    }
    fn scope(&self) -> Scope {
        self.scope
    }
    fn scope_id(&self) -> Option<Uuid> {
        self.scope_id
    }
}

/// Vector-index upsert payload (§4.2 Create): denormalizes the fields the
/// vector leg of search needs so it never has to join back to the relational
/// store mid-query.
#[derive(Debug, Clone, Serialize)]
pub struct VectorPayload {
    pub memory_id: MemoryId,
    pub organization_id: OrganizationId,
    pub owner_id: UserId,
    pub scope: Scope,
    pub scope_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub classification: Classification,
    pub memory_type: MemoryType,
    pub created_at: DateTime<Utc>,
}

/// Per-memory mutable counters (C5, §3). Defaults match spec exactly:
/// importance 0.5, confidence 0.8, contradicted false, risk 0.0, count 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationState {
    pub memory_id: MemoryId,
    pub base_importance: f64,
    pub confidence: f64,
    pub contradicted: bool,
    pub risk_factor: f64,
    pub access_count: i64,
    pub evidence_link_count: i64,
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl ActivationState {
    pub fn default_for(memory_id: MemoryId) -> Self {
        Self {
            memory_id,
            base_importance: 0.5,
            confidence: 0.8,
            contradicted: false,
            risk_factor: 0.0,
            access_count: 0,
            evidence_link_count: 0,
            last_accessed_at: None,
        }
    }

    /// Clamps every bounded field to its valid range (§4.5 nightly decay
    /// step 1).
    pub fn clamp(&mut self) {
        self.base_importance = self.base_importance.clamp(0.0, 1.0);
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self.risk_factor = self.risk_factor.clamp(0.0, 1.0);
        self.access_count = self.access_count.max(0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Balanced,
    Performance,
    Research,
}

impl SearchMode {
    /// Half-life in days for temporal decay (§4.2).
    pub fn half_life_days(&self) -> f64 {
        match self {
            SearchMode::Performance => 7.0,
            SearchMode::Balanced => 30.0,
            SearchMode::Research => 90.0,
        }
    }
}
