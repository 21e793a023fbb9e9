//! Permission-checked facade over a [`TaskQueue`] (§4.4: enqueue requires
//! `pipeline.enqueue`, dequeue requires `pipeline.dequeue`).

use crate::model::{DeadLetterEntry, PipelineTask, QueueStats};
use crate::queue::{SchedulerError, TaskQueue};
use chrono::{DateTime, Utc};
use memos_core::error::{Classify, ErrorKind};
use memos_core::{PipelineTaskId, TenantContext};
use memos_permission::PermissionChecker;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerServiceError {
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error(transparent)]
    Permission(#[from] memos_permission::PermissionError),
}

impl Classify for SchedulerServiceError {
    fn kind(&self) -> ErrorKind {
        match self {
            SchedulerServiceError::Scheduler(SchedulerError::NotFound) => ErrorKind::NotFound,
            SchedulerServiceError::Scheduler(SchedulerError::InvalidTransition) => ErrorKind::Conflict,
            SchedulerServiceError::PermissionDenied(_) => ErrorKind::AuthorizationDenied,
            SchedulerServiceError::Permission(_) => ErrorKind::UpstreamUnavailable,
        }
    }
}

pub struct SchedulerService<Q, P> {
    queue: Arc<Q>,
    permissions: Arc<P>,
}

impl<Q, P> SchedulerService<Q, P>
where
    Q: TaskQueue,
    P: PermissionChecker,
{
    pub fn new(queue: Arc<Q>, permissions: Arc<P>) -> Self {
        Self { queue, permissions }
    }

    async fn require(
        &self,
        ctx: &TenantContext,
        permission: &str,
    ) -> Result<(), SchedulerServiceError> {
        let user_id = ctx.actor.user_id().unwrap_or_default();
        if !self
            .permissions
            .has_permission(user_id, ctx.organization_id, permission)
            .await?
        {
            return Err(SchedulerServiceError::PermissionDenied(permission.to_string()));
        }
        Ok(())
    }

    pub async fn enqueue(
        &self,
        ctx: &TenantContext,
        task: PipelineTask,
    ) -> Result<PipelineTaskId, SchedulerServiceError> {
        self.require(ctx, "pipeline:enqueue").await?;
        Ok(self.queue.enqueue(task).await?)
    }

    pub async fn dequeue(
        &self,
        ctx: &TenantContext,
        now: DateTime<Utc>,
    ) -> Result<Option<PipelineTask>, SchedulerServiceError> {
        self.require(ctx, "pipeline:dequeue").await?;
        Ok(self.queue.dequeue(ctx.organization_id, now).await?)
    }

    pub async fn mark_succeeded(
        &self,
        task_id: PipelineTaskId,
        actual_tokens: Option<i64>,
        actual_latency_ms: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<PipelineTask, SchedulerServiceError> {
        Ok(self
            .queue
            .mark_succeeded(task_id, actual_tokens, actual_latency_ms, now)
            .await?)
    }

    pub async fn mark_failed(
        &self,
        task_id: PipelineTaskId,
        error: String,
        now: DateTime<Utc>,
    ) -> Result<PipelineTask, SchedulerServiceError> {
        Ok(self.queue.mark_failed(task_id, error, now).await?)
    }

    pub async fn mark_blocked(
        &self,
        task_id: PipelineTaskId,
        reason: String,
        blocks_on_task_id: Option<PipelineTaskId>,
    ) -> Result<PipelineTask, SchedulerServiceError> {
        Ok(self
            .queue
            .mark_blocked(task_id, reason, blocks_on_task_id)
            .await?)
    }

    pub async fn reconcile_blocked(
        &self,
        ctx: &TenantContext,
    ) -> Result<usize, SchedulerServiceError> {
        Ok(self.queue.reconcile_blocked(ctx.organization_id).await?)
    }

    pub async fn stats(&self, ctx: &TenantContext, now: DateTime<Utc>) -> QueueStats {
        self.queue.stats(ctx.organization_id, now).await
    }

    pub async fn dead_letters(&self, ctx: &TenantContext) -> Vec<DeadLetterEntry> {
        self.queue.dead_letters(ctx.organization_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::InMemoryTaskQueue;
    use async_trait::async_trait;
    use memos_core::{new_id, OrganizationId, UserId};
    use memos_permission::PermissionError;
    use serde_json::json;

    struct DenyEnqueue;

    #[async_trait]
    impl PermissionChecker for DenyEnqueue {
        async fn has_permission(
            &self,
            _user_id: UserId,
            _organization_id: OrganizationId,
            requested: &str,
        ) -> Result<bool, PermissionError> {
            Ok(requested != "pipeline:enqueue")
        }
    }

    #[tokio::test]
    async fn enqueue_denied_without_pipeline_permission() {
        let service = SchedulerService::new(
            Arc::new(InMemoryTaskQueue::default()),
            Arc::new(DenyEnqueue),
        );
        let org = new_id();
        let ctx = TenantContext::for_user(new_id(), org, vec![], 0);
        let task = PipelineTask::new(org, "enrich", 0, Utc::now(), "default", 3, new_id(), json!({}));

        let result = service.enqueue(&ctx, task).await;
        assert!(matches!(
            result,
            Err(SchedulerServiceError::PermissionDenied(_))
        ));
    }
}
