//! Permission-checked facade over the goal graph (§4.6). Mirrors
//! `memos-scheduler`'s service layer: every mutation goes through
//! `require()` before touching a repository, and non-trivial mutations
//! also pass the meta-supervisor.

use crate::blockers::{detect_blockers, escalate_if_blocked};
use crate::model::{Goal, GoalActivityLog, GoalEdge, GoalMemoryLink, GoalNode, GoalStatus, LinkedBy};
use crate::repo::{GoalActivityLogRepo, GoalEdgeRepo, GoalMemoryLinkRepo, GoalNodeRepo, GoalRepo, GoalStoreError};
use crate::rollup::compute_rollup;
use crate::supervisor::{review_completion, review_evidence_link, SupervisorDecision};
use memos_audit::{AuditEvent, AuditSink, Severity};
use memos_core::error::{Classify, ErrorKind};
use memos_core::{GoalId, Scope, TenantContext};
use memos_permission::PermissionChecker;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum GoalGraphServiceError {
    #[error(transparent)]
    Store(#[from] GoalStoreError),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error(transparent)]
    Permission(#[from] memos_permission::PermissionError),
    #[error("rejected by supervisor: {0}")]
    SupervisorRejected(String),
    #[error("audit sink unavailable: {0}")]
    Audit(String),
}

impl Classify for GoalGraphServiceError {
    fn kind(&self) -> ErrorKind {
        match self {
            GoalGraphServiceError::Store(GoalStoreError::NotFound) => ErrorKind::NotFound,
            GoalGraphServiceError::Store(GoalStoreError::Conflict(_)) => ErrorKind::Conflict,
            GoalGraphServiceError::Store(GoalStoreError::Unavailable(_)) => ErrorKind::UpstreamUnavailable,
            GoalGraphServiceError::PermissionDenied(_) => ErrorKind::AuthorizationDenied,
            GoalGraphServiceError::Permission(_) => ErrorKind::UpstreamUnavailable,
            GoalGraphServiceError::SupervisorRejected(_) => ErrorKind::Validation,
            GoalGraphServiceError::Audit(_) => ErrorKind::Internal,
        }
    }
}

pub struct GoalGraphService<GR, NR, ER, LR, AR, P> {
    goals: Arc<GR>,
    nodes: Arc<NR>,
    edges: Arc<ER>,
    links: Arc<LR>,
    activity: Arc<AR>,
    permissions: Arc<P>,
    audit: Arc<dyn AuditSink>,
}

impl<GR, NR, ER, LR, AR, P> GoalGraphService<GR, NR, ER, LR, AR, P>
where
    GR: GoalRepo,
    NR: GoalNodeRepo,
    ER: GoalEdgeRepo,
    LR: GoalMemoryLinkRepo,
    AR: GoalActivityLogRepo,
    P: PermissionChecker,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        goals: Arc<GR>,
        nodes: Arc<NR>,
        edges: Arc<ER>,
        links: Arc<LR>,
        activity: Arc<AR>,
        permissions: Arc<P>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self { goals, nodes, edges, links, activity, permissions, audit }
    }

    async fn require(&self, ctx: &TenantContext, permission: &str) -> Result<(), GoalGraphServiceError> {
        let user_id = ctx.actor.user_id().unwrap_or_default();
        if !self.permissions.has_permission(user_id, ctx.organization_id, permission).await? {
            return Err(GoalGraphServiceError::PermissionDenied(permission.to_string()));
        }
        Ok(())
    }

    async fn record_audit(&self, ctx: &TenantContext, event_type: &str, severity: Severity, resource_id: GoalId, details: serde_json::Value) {
        let event = AuditEvent::new(ctx, event_type, details).with_severity(severity).on_resource("goal", resource_id);
        if let Err(err) = self.audit.record(event).await {
            tracing::warn!(%err, "failed to record goal graph audit event");
        }
    }

    pub async fn create_goal(&self, ctx: &TenantContext, goal: Goal) -> Result<Goal, GoalGraphServiceError> {
        self.require(ctx, "goal:create").await?;
        self.goals.insert(goal.clone()).await?;
        self.record_audit(ctx, "goal.created", Severity::Info, goal.id, json!({ "title": goal.title })).await;
        Ok(goal)
    }

    pub async fn upsert_node(&self, ctx: &TenantContext, node: GoalNode) -> Result<(), GoalGraphServiceError> {
        self.require(ctx, "goal:update").await?;
        self.nodes.upsert(node).await?;
        Ok(())
    }

    pub async fn upsert_edge(&self, ctx: &TenantContext, edge: GoalEdge) -> Result<(), GoalGraphServiceError> {
        self.require(ctx, "goal:update").await?;
        self.edges.upsert(edge).await?;
        Ok(())
    }

    /// Sets a goal's status, running it past the meta-supervisor first when
    /// the transition is to `completed`.
    pub async fn transition_status(
        &self,
        ctx: &TenantContext,
        mut goal: Goal,
        new_status: GoalStatus,
    ) -> Result<Goal, GoalGraphServiceError> {
        self.require(ctx, "goal:update").await?;

        if new_status == GoalStatus::Completed {
            let evidence_count = self.links.list_for_goal(ctx.organization_id, goal.id).await?.len();
            let decision = review_completion(goal.goal_type, true, evidence_count, MIN_POLICY_EVIDENCE_LINKS);
            if let SupervisorDecision::Reject(reason) = decision {
                self.record_audit(ctx, "goal.completion_rejected", Severity::Warn, goal.id, json!({ "reason": reason })).await;
                return Err(GoalGraphServiceError::SupervisorRejected(reason));
            }
            goal.completed_at = Some(chrono::Utc::now());
        }

        goal.status = new_status;
        goal.updated_at = chrono::Utc::now();
        self.goals.update(goal.clone()).await?;
        self.record_audit(ctx, "goal.status_changed", Severity::Info, goal.id, json!({ "status": format!("{new_status:?}") })).await;
        Ok(goal)
    }

    /// Links a memory to a goal as evidence, gated by the meta-supervisor's
    /// cross-scope check.
    pub async fn link_memory(
        &self,
        ctx: &TenantContext,
        link: GoalMemoryLink,
        memory_scope: Scope,
        goal_scope: Scope,
    ) -> Result<(), GoalGraphServiceError> {
        self.require(ctx, "goal:link_memory").await?;

        if let SupervisorDecision::Reject(reason) = review_evidence_link(memory_scope, goal_scope) {
            self.record_audit(ctx, "goal.evidence_link_rejected", Severity::Warn, link.goal_id, json!({ "reason": reason })).await;
            return Err(GoalGraphServiceError::SupervisorRejected(reason));
        }

        self.links.upsert(link.clone()).await?;
        Ok(())
    }

    pub async fn get_goal(&self, ctx: &TenantContext, goal_id: GoalId) -> Result<Option<Goal>, GoalGraphServiceError> {
        self.require(ctx, "goal:read").await?;
        Ok(self.goals.get(ctx.organization_id, goal_id).await?)
    }

    pub async fn rollup(&self, ctx: &TenantContext, goal_id: GoalId) -> Result<crate::model::ProgressRollup, GoalGraphServiceError> {
        self.require(ctx, "goal:read").await?;
        let goal = self.goals.get(ctx.organization_id, goal_id).await?.ok_or(GoalStoreError::NotFound)?;
        let nodes = self.nodes.list_for_goal(goal_id).await?;
        Ok(compute_rollup(&nodes, goal.confidence))
    }

    /// Re-evaluates blockers for a goal and escalates if needed, logging the
    /// transition via the activity log.
    pub async fn check_blockers(&self, ctx: &TenantContext, goal_id: GoalId) -> Result<Goal, GoalGraphServiceError> {
        self.require(ctx, "goal:update").await?;
        let goal = self.goals.get(ctx.organization_id, goal_id).await?.ok_or(GoalStoreError::NotFound)?;
        let nodes = self.nodes.list_for_goal(goal_id).await?;
        let node_ids: Vec<_> = nodes.iter().map(|n| n.id).collect();
        let edges = self.edges.list_for_goal(&node_ids).await?;
        let updated = escalate_if_blocked(self.goals.as_ref(), self.activity.as_ref(), goal, &nodes, &edges).await?;
        Ok(updated)
    }

    pub async fn activity_log(&self, ctx: &TenantContext, goal_id: GoalId) -> Result<Vec<GoalActivityLog>, GoalGraphServiceError> {
        self.require(ctx, "goal:read").await?;
        Ok(self.activity.list_for_goal(goal_id).await?)
    }
}

const MIN_POLICY_EVIDENCE_LINKS: usize = 2;

/// Exposed for callers that only want the pure detection, without the
/// permission/persistence wrapping (e.g. a dry-run preview in the API).
pub fn preview_blockers(nodes: &[GoalNode], edges: &[GoalEdge]) -> Vec<String> {
    detect_blockers(nodes, edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GoalType, LinkType, OwnerType};
    use crate::repo::{InMemoryGoalActivityLogRepo, InMemoryGoalEdgeRepo, InMemoryGoalMemoryLinkRepo, InMemoryGoalNodeRepo, InMemoryGoalRepo};
    use async_trait::async_trait;
    use memos_audit::InMemoryAuditSink;
    use memos_core::{new_id, OrganizationId, UserId};
    use memos_permission::PermissionError;

    struct AllowAll;

    #[async_trait]
    impl PermissionChecker for AllowAll {
        async fn has_permission(&self, _user_id: UserId, _organization_id: OrganizationId, _requested: &str) -> Result<bool, PermissionError> {
            Ok(true)
        }
    }

    struct DenyAll;

    #[async_trait]
    impl PermissionChecker for DenyAll {
        async fn has_permission(&self, _user_id: UserId, _organization_id: OrganizationId, _requested: &str) -> Result<bool, PermissionError> {
            Ok(false)
        }
    }

    fn service(
        permissions: impl PermissionChecker + 'static,
    ) -> GoalGraphService<InMemoryGoalRepo, InMemoryGoalNodeRepo, InMemoryGoalEdgeRepo, InMemoryGoalMemoryLinkRepo, InMemoryGoalActivityLogRepo, impl PermissionChecker> {
        GoalGraphService::new(
            Arc::new(InMemoryGoalRepo::default()),
            Arc::new(InMemoryGoalNodeRepo::default()),
            Arc::new(InMemoryGoalEdgeRepo::default()),
            Arc::new(InMemoryGoalMemoryLinkRepo::default()),
            Arc::new(InMemoryGoalActivityLogRepo::default()),
            Arc::new(permissions),
            Arc::new(InMemoryAuditSink::default()),
        )
    }

    #[tokio::test]
    async fn create_goal_denied_without_permission() {
        let svc = service(DenyAll);
        let org = new_id();
        let ctx = TenantContext::for_user(new_id(), org, vec![], 0);
        let goal = Goal::propose(org, new_id(), OwnerType::User, new_id(), "g", GoalType::Task, Scope::Personal, None, 0.5);
        let result = svc.create_goal(&ctx, goal).await;
        assert!(matches!(result, Err(GoalGraphServiceError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn policy_goal_completion_rejected_without_evidence() {
        let svc = service(AllowAll);
        let org = new_id();
        let ctx = TenantContext::for_user(new_id(), org, vec![], 0);
        let goal = Goal::propose(org, new_id(), OwnerType::User, new_id(), "g", GoalType::Policy, Scope::Organization, None, 0.9);
        let goal = svc.create_goal(&ctx, goal).await.unwrap();

        let result = svc.transition_status(&ctx, goal, GoalStatus::Completed).await;
        assert!(matches!(result, Err(GoalGraphServiceError::SupervisorRejected(_))));
    }

    #[tokio::test]
    async fn policy_goal_completion_allowed_with_enough_evidence() {
        let svc = service(AllowAll);
        let org = new_id();
        let ctx = TenantContext::for_user(new_id(), org, vec![], 0);
        let goal = Goal::propose(org, new_id(), OwnerType::User, new_id(), "g", GoalType::Policy, Scope::Organization, None, 0.9);
        let goal = svc.create_goal(&ctx, goal).await.unwrap();

        for _ in 0..2 {
            let link = GoalMemoryLink {
                organization_id: org,
                goal_id: goal.id,
                memory_id: new_id(),
                node_id: None,
                link_type: LinkType::Evidence,
                linked_by: LinkedBy::User,
                confidence: 0.8,
            };
            svc.link_memory(&ctx, link, Scope::Organization, Scope::Organization).await.unwrap();
        }

        let result = svc.transition_status(&ctx, goal, GoalStatus::Completed).await;
        assert!(result.is_ok());
        assert_eq!(result.unwrap().status, GoalStatus::Completed);
    }

    #[tokio::test]
    async fn evidence_link_rejected_across_scopes() {
        let svc = service(AllowAll);
        let org = new_id();
        let ctx = TenantContext::for_user(new_id(), org, vec![], 0);
        let link = GoalMemoryLink {
            organization_id: org,
            goal_id: new_id(),
            memory_id: new_id(),
            node_id: None,
            link_type: LinkType::Evidence,
            linked_by: LinkedBy::User,
            confidence: 0.8,
        };
        let result = svc.link_memory(&ctx, link, Scope::Personal, Scope::Organization).await;
        assert!(matches!(result, Err(GoalGraphServiceError::SupervisorRejected(_))));
    }
}
