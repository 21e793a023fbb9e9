//! Snapshot lifecycle (§6 persisted state layout: JSON/Markdown/ZIP).

use chrono::{DateTime, Utc};
use memos_core::{MemoryId, OrganizationId, Scope, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Json,
    Markdown,
    Zip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotFilters {
    pub scope: Option<Scope>,
    pub tags: Vec<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub id: Uuid,
    pub organization_id: OrganizationId,
    pub user_id: UserId,
    pub name: String,
    pub format: ExportFormat,
    pub status: SnapshotStatus,
    pub memory_ids: Vec<MemoryId>,
    pub filters: SnapshotFilters,
    pub content_size_bytes: Option<usize>,
    pub memory_count: Option<usize>,
    pub error_message: Option<String>,
    pub retention_days: i32,
    pub expires_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl MemorySnapshot {
    pub fn pending(
        organization_id: OrganizationId,
        user_id: UserId,
        name: impl Into<String>,
        format: ExportFormat,
        memory_ids: Vec<MemoryId>,
        filters: SnapshotFilters,
        retention_days: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization_id,
            user_id,
            name: name.into(),
            format,
            status: SnapshotStatus::Pending,
            memory_ids,
            filters,
            content_size_bytes: None,
            memory_count: None,
            error_message: None,
            retention_days,
            expires_at: now + chrono::Duration::days(retention_days as i64),
            started_at: None,
            completed_at: None,
            created_at: now,
        }
    }
}

/// Schema-versioned JSON export envelope (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonExportEnvelope {
    pub version: &'static str,
    pub export_date: DateTime<Utc>,
    pub organization_id: OrganizationId,
    pub memory_count: usize,
    pub memories: Vec<JsonExportMemory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonExportMemory {
    pub id: MemoryId,
    pub title: String,
    pub content: String,
    pub scope: Scope,
    pub tags: Vec<String>,
    pub source_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: Value,
}

pub const JSON_EXPORT_SCHEMA_VERSION: &str = "1.0";
