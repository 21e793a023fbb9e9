//! PolicyVersion lifecycle model (§3, §4.7).

use chrono::{DateTime, Utc};
use memos_core::{OrganizationId, PolicyVersionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloutStatus {
    Draft,
    Canary,
    Staged,
    Active,
    Superseded,
    RolledBack,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyVersion {
    pub id: PolicyVersionId,
    pub organization_id: OrganizationId,
    pub policy_name: String,
    pub version: i32,
    pub rollout_status: RolloutStatus,
    pub rollout_percentage: f64,
    pub canary_group_ids: Vec<Uuid>,
    pub policy_config: Value,
    pub validation_schema: Option<Value>,
    pub success_count: i64,
    pub failure_count: i64,
    pub error_rate: f64,
    pub activated_at: Option<DateTime<Utc>>,
    pub superseded_by_version: Option<i32>,
    pub rolled_back_to_version: Option<i32>,
    pub rollback_reason: Option<String>,
}

impl PolicyVersion {
    pub fn draft(organization_id: OrganizationId, policy_name: impl Into<String>, version: i32, policy_config: Value) -> Self {
        Self {
            id: memos_core::new_id(),
            organization_id,
            policy_name: policy_name.into(),
            version,
            rollout_status: RolloutStatus::Draft,
            rollout_percentage: 0.0,
            canary_group_ids: Vec::new(),
            policy_config,
            validation_schema: None,
            success_count: 0,
            failure_count: 0,
            error_rate: 0.0,
            activated_at: None,
            superseded_by_version: None,
            rolled_back_to_version: None,
            rollback_reason: None,
        }
    }

    pub fn total_evaluations(&self) -> i64 {
        self.success_count + self.failure_count
    }
}
