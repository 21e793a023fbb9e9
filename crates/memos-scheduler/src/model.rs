use chrono::{DateTime, Utc};
use memos_core::{OrganizationId, PipelineTaskId, TraceId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Blocked,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineTask {
    pub id: PipelineTaskId,
    pub organization_id: OrganizationId,
    pub task_type: String,
    pub status: TaskStatus,
    pub priority: i32,
    pub sla_deadline: DateTime<Utc>,
    pub sla_category: String,
    pub estimated_tokens: Option<i64>,
    pub actual_tokens: Option<i64>,
    pub estimated_latency_ms: Option<i64>,
    pub duration_ms: Option<i64>,
    pub blocks_on_task_id: Option<PipelineTaskId>,
    pub blocked_by_quota: bool,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub metadata: Value,
    pub trace_id: TraceId,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PipelineTask {
    pub fn new(
        organization_id: OrganizationId,
        task_type: impl Into<String>,
        priority: i32,
        sla_deadline: DateTime<Utc>,
        sla_category: impl Into<String>,
        max_attempts: i32,
        trace_id: TraceId,
        metadata: Value,
    ) -> Self {
        Self {
            id: memos_core::new_id(),
            organization_id,
            task_type: task_type.into(),
            status: TaskStatus::Queued,
            priority,
            sla_deadline,
            sla_category: sla_category.into(),
            estimated_tokens: None,
            actual_tokens: None,
            estimated_latency_ms: None,
            duration_ms: None,
            blocks_on_task_id: None,
            blocked_by_quota: false,
            attempts: 0,
            max_attempts,
            last_error: None,
            metadata,
            trace_id,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn sla_remaining_ms(&self, now: DateTime<Utc>) -> i64 {
        (self.sla_deadline - now).num_milliseconds()
    }

    pub fn sla_breached(&self, now: DateTime<Utc>) -> bool {
        self.sla_remaining_ms(now) < 0
    }

    /// Soft timeout for a running task: ~5x `estimated_latency_ms`, floored
    /// at `floor_ms` (default 60s per §5).
    pub fn soft_timeout_ms(&self, floor_ms: i64) -> i64 {
        let estimate = self.estimated_latency_ms.unwrap_or(0) * 5;
        estimate.max(floor_ms)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeadLetterEntry {
    pub task: PipelineTask,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueStats {
    pub queued: usize,
    pub running: usize,
    pub blocked: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub breached: usize,
    pub succeeded_last_hour: usize,
    pub failed_last_hour: usize,
    pub avg_queue_time_ms: f64,
    pub avg_exec_time_ms: f64,
    pub sla_compliance_rate: f64,
    pub queue_depth_by_task_type: std::collections::BTreeMap<String, usize>,
    pub breach_count_by_sla_category: std::collections::BTreeMap<String, usize>,
}
