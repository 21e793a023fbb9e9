//! Permission-checked snapshot facade (§6). Mirrors the other service
//! layers: `require()` then delegate. Unlike a DB-backed store, filtering
//! runs in-process over the candidate memories the caller supplies, since
//! no crate in this workspace performs unbounded organization-wide scans.

use crate::exporter::{build_json_export, build_markdown_export, build_zip_export, ExportError};
use crate::model::{ExportFormat, MemorySnapshot, SnapshotFilters, SnapshotStatus};
use crate::repo::{SnapshotRepo, SnapshotRepoError};
use memos_audit::{AuditEvent, AuditSink, Severity};
use memos_core::error::{Classify, ErrorKind};
use memos_core::{OrganizationId, TenantContext};
use memos_permission::PermissionChecker;
use memos_store::Memory;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_RETENTION_DAYS: i32 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ExportServiceError {
    #[error(transparent)]
    Repo(#[from] SnapshotRepoError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error(transparent)]
    Permission(#[from] memos_permission::PermissionError),
}

impl Classify for ExportServiceError {
    fn kind(&self) -> ErrorKind {
        match self {
            ExportServiceError::Repo(SnapshotRepoError::NotFound) => ErrorKind::NotFound,
            ExportServiceError::Repo(SnapshotRepoError::Unavailable(_)) => ErrorKind::UpstreamUnavailable,
            ExportServiceError::Export(_) => ErrorKind::Internal,
            ExportServiceError::PermissionDenied(_) => ErrorKind::AuthorizationDenied,
            ExportServiceError::Permission(_) => ErrorKind::UpstreamUnavailable,
        }
    }
}

fn matches_filters(memory: &Memory, filters: &SnapshotFilters) -> bool {
    if let Some(scope) = filters.scope {
        if memory.scope != scope {
            return false;
        }
    }
    if !filters.tags.is_empty() && !filters.tags.iter().any(|t| memory.tags.contains(t)) {
        return false;
    }
    if let Some(after) = filters.created_after {
        if memory.created_at < after {
            return false;
        }
    }
    if let Some(before) = filters.created_before {
        if memory.created_at > before {
            return false;
        }
    }
    true
}

pub struct SnapshotService<R, P> {
    repo: Arc<R>,
    permissions: Arc<P>,
    audit: Arc<dyn AuditSink>,
}

impl<R, P> SnapshotService<R, P>
where
    R: SnapshotRepo,
    P: PermissionChecker,
{
    pub fn new(repo: Arc<R>, permissions: Arc<P>, audit: Arc<dyn AuditSink>) -> Self {
        Self { repo, permissions, audit }
    }

    async fn require(&self, ctx: &TenantContext, permission: &str) -> Result<(), ExportServiceError> {
        let user_id = ctx.actor.user_id().unwrap_or_default();
        if !self.permissions.has_permission(user_id, ctx.organization_id, permission).await? {
            return Err(ExportServiceError::PermissionDenied(permission.to_string()));
        }
        Ok(())
    }

    /// Filters `candidate_memories` (already scoped to the caller's
    /// organization by the caller), builds the export content, and
    /// persists a completed snapshot record. Returns the record and the
    /// rendered bytes so the caller can hand them to whatever storage
    /// backs snapshot downloads.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_snapshot(
        &self,
        ctx: &TenantContext,
        name: &str,
        format: ExportFormat,
        candidate_memories: &[Memory],
        filters: SnapshotFilters,
        retention_days: i32,
    ) -> Result<(MemorySnapshot, Vec<u8>), ExportServiceError> {
        self.require(ctx, "export:create").await?;

        let selected: Vec<Memory> = candidate_memories.iter().filter(|m| matches_filters(m, &filters)).cloned().collect();
        let memory_ids = selected.iter().map(|m| m.id).collect();

        let mut snapshot = MemorySnapshot::pending(ctx.organization_id, ctx.actor.user_id().unwrap_or_default(), name, format, memory_ids, filters, retention_days);
        self.repo.insert(snapshot.clone()).await?;

        snapshot.status = SnapshotStatus::InProgress;
        snapshot.started_at = Some(chrono::Utc::now());
        self.repo.update(snapshot.clone()).await?;

        let render_result = match format {
            ExportFormat::Json => build_json_export(ctx.organization_id, &selected).map_err(ExportServiceError::from),
            ExportFormat::Markdown => Ok(build_markdown_export(ctx.organization_id, &selected)),
            ExportFormat::Zip => build_zip_export(ctx.organization_id, &selected).map_err(ExportServiceError::from),
        };

        let content = match render_result {
            Ok(content) => content,
            Err(err) => {
                snapshot.status = SnapshotStatus::Failed;
                snapshot.error_message = Some(err.to_string());
                self.repo.update(snapshot.clone()).await?;
                return Err(err);
            }
        };

        snapshot.content_size_bytes = Some(content.len());
        snapshot.memory_count = Some(selected.len());
        snapshot.status = SnapshotStatus::Completed;
        snapshot.completed_at = Some(chrono::Utc::now());
        self.repo.update(snapshot.clone()).await?;

        self.record_audit(ctx, "export.snapshot_created", snapshot.id, json!({ "memory_count": selected.len() })).await;
        Ok((snapshot, content))
    }

    pub async fn get_snapshot(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<MemorySnapshot>, ExportServiceError> {
        self.require(ctx, "export:read").await?;
        Ok(self.repo.get(ctx.organization_id, id).await?)
    }

    pub async fn list_snapshots(&self, ctx: &TenantContext) -> Result<Vec<MemorySnapshot>, ExportServiceError> {
        self.require(ctx, "export:read").await?;
        Ok(self.repo.list(ctx.organization_id).await?)
    }

    pub async fn delete_snapshot(&self, ctx: &TenantContext, id: Uuid) -> Result<bool, ExportServiceError> {
        self.require(ctx, "export:delete").await?;
        let deleted = self.repo.delete(ctx.organization_id, id).await?;
        if deleted {
            self.record_audit(ctx, "export.snapshot_deleted", id, json!({})).await;
        }
        Ok(deleted)
    }

    pub async fn cleanup_expired(&self, organization_id: OrganizationId) -> Result<usize, ExportServiceError> {
        let snapshots = self.repo.list(organization_id).await?;
        let now = chrono::Utc::now();
        let mut deleted = 0;
        for snapshot in snapshots {
            if snapshot.status == SnapshotStatus::Completed && snapshot.expires_at < now && self.repo.delete(organization_id, snapshot.id).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn record_audit(&self, ctx: &TenantContext, event_type: &str, resource_id: Uuid, details: serde_json::Value) {
        let event = AuditEvent::new(ctx, event_type, details).with_severity(Severity::Info).on_resource("memory_snapshot", resource_id);
        if let Err(err) = self.audit.record(event).await {
            tracing::warn!(%err, "failed to record export audit event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::InMemorySnapshotRepo;
    use async_trait::async_trait;
    use memos_audit::InMemoryAuditSink;
    use memos_core::{new_id, Scope, UserId};
    use memos_permission::PermissionError;
    use memos_store::{Classification, MemoryType};
    use std::collections::HashMap;

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

    fn memory(organization_id: OrganizationId, scope: Scope, tags: Vec<String>) -> Memory {
        let now = chrono::Utc::now();
        Memory {
            id: new_id(),
            organization_id,
            owner_user_id: new_id(),
            scope,
            scope_id: None,
            memory_type: MemoryType::ShortTerm,
            classification: Classification::Internal,
            required_clearance: 0,
            title: "t".into(),
            content_preview: "c".into(),
            content_hash: "h".into(),
            tags,
            entities: HashMap::new(),
            metadata: serde_json::json!({}),
            source_type: "api".into(),
            vector_id: None,
            embedding_model: None,
            is_active: true,
            legal_hold: false,
            created_at: now,
            updated_at: now,
            access_count: 0,
            last_accessed_at: None,
        }
    }

    fn service(permissions: impl PermissionChecker + 'static) -> SnapshotService<InMemorySnapshotRepo, impl PermissionChecker> {
        SnapshotService::new(Arc::new(InMemorySnapshotRepo::default()), Arc::new(permissions), Arc::new(InMemoryAuditSink::default()))
    }

    #[tokio::test]
    async fn create_snapshot_denied_without_permission() {
        let svc = service(DenyAll);
        let org = new_id();
        let ctx = TenantContext::for_user(new_id(), org, vec![], 0);
        let result = svc.create_snapshot(&ctx, "s", ExportFormat::Json, &[], SnapshotFilters::default(), 30).await;
        assert!(matches!(result, Err(ExportServiceError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn create_snapshot_filters_by_scope_and_tags() {
        let svc = service(AllowAll);
        let org = new_id();
        let ctx = TenantContext::for_user(new_id(), org, vec![], 0);

        let matching = memory(org, Scope::Team, vec!["keep".to_string()]);
        let wrong_scope = memory(org, Scope::Personal, vec!["keep".to_string()]);
        let candidates = vec![matching.clone(), wrong_scope];

        let filters = SnapshotFilters { scope: Some(Scope::Team), tags: vec!["keep".to_string()], created_after: None, created_before: None };
        let (snapshot, content) = svc.create_snapshot(&ctx, "s", ExportFormat::Json, &candidates, filters, 30).await.unwrap();

        assert_eq!(snapshot.memory_count, Some(1));
        assert_eq!(snapshot.status, SnapshotStatus::Completed);
        assert!(!content.is_empty());
    }

    #[tokio::test]
    async fn zip_export_builds_non_empty_archive() {
        let svc = service(AllowAll);
        let org = new_id();
        let ctx = TenantContext::for_user(new_id(), org, vec![], 0);
        let candidates = vec![memory(org, Scope::Organization, vec![])];

        let (_snapshot, content) = svc.create_snapshot(&ctx, "s", ExportFormat::Zip, &candidates, SnapshotFilters::default(), 30).await.unwrap();
        assert!(!content.is_empty());
    }

    #[tokio::test]
    async fn cleanup_expired_removes_only_completed_and_past_expiry() {
        let svc = service(AllowAll);
        let org = new_id();
        let ctx = TenantContext::for_user(new_id(), org, vec![], 0);
        let (snapshot, _) = svc.create_snapshot(&ctx, "s", ExportFormat::Json, &[], SnapshotFilters::default(), -1).await.unwrap();
        assert!(snapshot.expires_at < chrono::Utc::now());

        let deleted = svc.cleanup_expired(org).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(svc.get_snapshot(&ctx, snapshot.id).await.unwrap().is_none());
    }
}
