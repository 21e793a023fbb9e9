//! Durable SLA-ordered queue engine (§4.4). The ordering and transition
//! rules live here; `service.rs` wraps this with the permission checks named
//! in the spec ("Enqueue requires scope `pipeline.enqueue`", etc).

use crate::model::{DeadLetterEntry, PipelineTask, QueueStats, TaskStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use memos_core::{OrganizationId, PipelineTaskId};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("task not found")]
    NotFound,
    #[error("task is not in a state that permits this transition")]
    InvalidTransition,
}

#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn enqueue(&self, task: PipelineTask) -> Result<PipelineTaskId, SchedulerError>;

    /// Selects and transitions the next task for `organization_id` per the
    /// four-level ordering in §4.4. Returns `None` when nothing is queued.
    /// The in-memory implementation serializes this behind a single mutex,
    /// standing in for the DB's `FOR UPDATE SKIP LOCKED` semantics (§4.4,
    /// §5): only one caller can ever win a given row.
    async fn dequeue(
        &self,
        organization_id: OrganizationId,
        now: DateTime<Utc>,
    ) -> Result<Option<PipelineTask>, SchedulerError>;

    async fn mark_succeeded(
        &self,
        task_id: PipelineTaskId,
        actual_tokens: Option<i64>,
        actual_latency_ms: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<PipelineTask, SchedulerError>;

    async fn mark_failed(
        &self,
        task_id: PipelineTaskId,
        error: String,
        now: DateTime<Utc>,
    ) -> Result<PipelineTask, SchedulerError>;

    async fn mark_blocked(
        &self,
        task_id: PipelineTaskId,
        reason: String,
        blocks_on_task_id: Option<PipelineTaskId>,
    ) -> Result<PipelineTask, SchedulerError>;

    /// Moves blocked tasks back to `queued` once their dependency has
    /// succeeded (§4.4).
    async fn reconcile_blocked(&self, organization_id: OrganizationId) -> Result<usize, SchedulerError>;

    async fn stats(&self, organization_id: OrganizationId, now: DateTime<Utc>) -> QueueStats;

    async fn dead_letters(&self, organization_id: OrganizationId) -> Vec<DeadLetterEntry>;
}

#[derive(Default)]
pub struct InMemoryTaskQueue {
    tasks: Mutex<Vec<PipelineTask>>,
    dlq: Mutex<Vec<DeadLetterEntry>>,
}

fn dequeue_order(a: &PipelineTask, b: &PipelineTask, now: DateTime<Utc>) -> Ordering {
    let breached_a = a.sla_breached(now);
    let breached_b = b.sla_breached(now);
    breached_b
        .cmp(&breached_a)
        .then_with(|| a.sla_deadline.cmp(&b.sla_deadline))
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.created_at.cmp(&b.created_at))
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn enqueue(&self, task: PipelineTask) -> Result<PipelineTaskId, SchedulerError> {
        let id = task.id;
        self.tasks.lock().push(task);
        Ok(id)
    }

    async fn dequeue(
        &self,
        organization_id: OrganizationId,
        now: DateTime<Utc>,
    ) -> Result<Option<PipelineTask>, SchedulerError> {
        let mut tasks = self.tasks.lock();
        let candidate_idx = tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.organization_id == organization_id && t.status == TaskStatus::Queued)
            .min_by(|(_, a), (_, b)| dequeue_order(a, b, now))
            .map(|(idx, _)| idx);

        let Some(idx) = candidate_idx else {
            return Ok(None);
        };
        let task = &mut tasks[idx];
        task.status = TaskStatus::Running;
        task.started_at = Some(now);
        task.attempts += 1;
        Ok(Some(task.clone()))
    }

    async fn mark_succeeded(
        &self,
        task_id: PipelineTaskId,
        actual_tokens: Option<i64>,
        actual_latency_ms: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<PipelineTask, SchedulerError> {
        let mut tasks = self.tasks.lock();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or(SchedulerError::NotFound)?;
        task.status = TaskStatus::Succeeded;
        task.completed_at = Some(now);
        task.actual_tokens = actual_tokens;
        task.duration_ms = task
            .started_at
            .map(|started| (now - started).num_milliseconds())
            .or(actual_latency_ms);
        Ok(task.clone())
    }

    async fn mark_failed(
        &self,
        task_id: PipelineTaskId,
        error: String,
        now: DateTime<Utc>,
    ) -> Result<PipelineTask, SchedulerError> {
        let mut tasks = self.tasks.lock();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or(SchedulerError::NotFound)?;
        task.last_error = Some(error.clone());

        if task.attempts < task.max_attempts {
            task.status = TaskStatus::Queued;
            task.started_at = None;
        } else {
            task.status = TaskStatus::Failed;
            task.completed_at = Some(now);
        }
        let result = task.clone();

        if result.status == TaskStatus::Failed {
            self.dlq.lock().push(DeadLetterEntry {
                task: result.clone(),
                reason: "max_retries_exceeded".to_string(),
                recorded_at: now,
            });
        }
        Ok(result)
    }

    async fn mark_blocked(
        &self,
        task_id: PipelineTaskId,
        reason: String,
        blocks_on_task_id: Option<PipelineTaskId>,
    ) -> Result<PipelineTask, SchedulerError> {
        let mut tasks = self.tasks.lock();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or(SchedulerError::NotFound)?;
        task.status = TaskStatus::Blocked;
        task.blocks_on_task_id = blocks_on_task_id;
        task.blocked_by_quota = reason == "quota";
        task.last_error = Some(reason);
        Ok(task.clone())
    }

    async fn reconcile_blocked(&self, organization_id: OrganizationId) -> Result<usize, SchedulerError> {
        let mut tasks = self.tasks.lock();
        let succeeded_ids: Vec<_> = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Succeeded)
            .map(|t| t.id)
            .collect();
        let mut unblocked = 0;
        for task in tasks.iter_mut() {
            if task.organization_id == organization_id
                && task.status == TaskStatus::Blocked
                && task
                    .blocks_on_task_id
                    .map(|dep| succeeded_ids.contains(&dep))
                    .unwrap_or(false)
            {
                task.status = TaskStatus::Queued;
                task.blocks_on_task_id = None;
                unblocked += 1;
            }
        }
        Ok(unblocked)
    }

    async fn stats(&self, organization_id: OrganizationId, now: DateTime<Utc>) -> QueueStats {
        let tasks = self.tasks.lock();
        let mut stats = QueueStats::default();
        let one_hour_ago = now - chrono::Duration::hours(1);
        let mut queue_wait_total = 0i64;
        let mut queue_wait_count = 0i64;
        let mut exec_total = 0i64;
        let mut exec_count = 0i64;
        let mut compliant = 0i64;
        let mut completed = 0i64;

        for task in tasks.iter().filter(|t| t.organization_id == organization_id) {
            match task.status {
                TaskStatus::Queued => stats.queued += 1,
                TaskStatus::Running => stats.running += 1,
                TaskStatus::Blocked => stats.blocked += 1,
                TaskStatus::Succeeded => stats.succeeded += 1,
                TaskStatus::Failed => stats.failed += 1,
            }
            if task.sla_breached(now) {
                stats.breached += 1;
                *stats
                    .breach_count_by_sla_category
                    .entry(task.sla_category.clone())
                    .or_insert(0) += 1;
            }
            *stats
                .queue_depth_by_task_type
                .entry(task.task_type.clone())
                .or_insert(0) += 1;

            if let Some(completed_at) = task.completed_at {
                if completed_at >= one_hour_ago {
                    match task.status {
                        TaskStatus::Succeeded => stats.succeeded_last_hour += 1,
                        TaskStatus::Failed => stats.failed_last_hour += 1,
                        _ => {}
                    }
                }
                if let Some(started_at) = task.started_at {
                    queue_wait_total += (started_at - task.created_at).num_milliseconds();
                    queue_wait_count += 1;
                    exec_total += (completed_at - started_at).num_milliseconds();
                    exec_count += 1;
                }
                completed += 1;
                if !task.sla_breached(completed_at) {
                    compliant += 1;
                }
            }
        }

        stats.avg_queue_time_ms = if queue_wait_count > 0 {
            queue_wait_total as f64 / queue_wait_count as f64
        } else {
            0.0
        };
        stats.avg_exec_time_ms = if exec_count > 0 {
            exec_total as f64 / exec_count as f64
        } else {
            0.0
        };
        stats.sla_compliance_rate = if completed > 0 {
            compliant as f64 / completed as f64
        } else {
            1.0
        };
        stats
    }

    async fn dead_letters(&self, organization_id: OrganizationId) -> Vec<DeadLetterEntry> {
        self.dlq
            .lock()
            .iter()
            .filter(|e| e.task.organization_id == organization_id)
            .cloned()
            .collect()
    }
}
