//! Memory Store (C4): create/update/soft-delete with the dual-write,
//! permission, and audit contract from §4.2.

use crate::model::{Classification, Memory, MemoryType, VectorPayload};
use crate::repo::{ActivationRepo, MemoryRepo, StoreError};
use crate::vector_index::VectorIndex;
use chrono::Utc;
use memos_audit::{AuditEvent, AuditSink};
use memos_core::error::{Classify, ErrorKind};
use memos_core::{MemoryId, OrganizationId, Scope, TenantContext, UserId};
use memos_permission::{
    check_memory_access, Action, MemorySharing, PermissionChecker, TeamMembership,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Default access-count threshold for short-term -> long-term promotion
/// (§4.2 "smart" path).
pub const DEFAULT_PROMOTION_THRESHOLD: i64 = 3;

#[derive(Debug, thiserror::Error)]
pub enum MemoryServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error(transparent)]
    Permission(#[from] memos_permission::PermissionError),
}

impl Classify for MemoryServiceError {
    fn kind(&self) -> ErrorKind {
        match self {
            MemoryServiceError::Store(StoreError::NotFound) => ErrorKind::NotFound,
            MemoryServiceError::Store(StoreError::Conflict(_)) => ErrorKind::Conflict,
            MemoryServiceError::Store(StoreError::LegalHold) => ErrorKind::Conflict,
            MemoryServiceError::Store(StoreError::Unavailable(_)) => ErrorKind::UpstreamUnavailable,
            MemoryServiceError::PermissionDenied(_) => ErrorKind::AuthorizationDenied,
            MemoryServiceError::Permission(_) => ErrorKind::UpstreamUnavailable,
        }
    }
}

pub struct CreateMemoryInput {
    pub owner_user_id: UserId,
    pub scope: Scope,
    pub scope_id: Option<Uuid>,
    pub memory_type: MemoryType,
    pub classification: Classification,
    pub required_clearance: i32,
    pub title: String,
    pub content_preview: String,
    pub tags: Vec<String>,
    pub entities: HashMap<String, Vec<String>>,
    pub metadata: serde_json::Value,
    pub source_type: String,
    pub vector_id: Option<String>,
    pub embedding_model: Option<String>,
    pub embedding: Vec<f32>,
}

pub struct MemoryStore<R, A, V, P> {
    repo: Arc<R>,
    activation_repo: Arc<A>,
    vector_index: Arc<V>,
    audit: Arc<dyn AuditSink>,
    permissions: Arc<P>,
    promotion_threshold: i64,
}

impl<R, A, V, P> MemoryStore<R, A, V, P>
where
    R: MemoryRepo,
    A: ActivationRepo,
    V: VectorIndex,
    P: PermissionChecker,
{
    pub fn new(
        repo: Arc<R>,
        activation_repo: Arc<A>,
        vector_index: Arc<V>,
        audit: Arc<dyn AuditSink>,
        permissions: Arc<P>,
    ) -> Self {
        Self {
            repo,
            activation_repo,
            vector_index,
            audit,
            permissions,
            promotion_threshold: DEFAULT_PROMOTION_THRESHOLD,
        }
    }

    pub fn with_promotion_threshold(mut self, threshold: i64) -> Self {
        self.promotion_threshold = threshold;
        self
    }

    /// Fetches a single memory, enforcing the same read-access decision
    /// `search` applies per-candidate (§4.1). Returns `Ok(None)` for both
    /// "doesn't exist" and "exists but access denied" so a 404 can't be
    /// used to probe cross-tenant IDs.
    pub async fn get(
        &self,
        ctx: &TenantContext,
        memory_id: MemoryId,
        team_memberships: &[TeamMembership],
        sharing: &[MemorySharing],
    ) -> Result<Option<Memory>, MemoryServiceError> {
        let Some(memory) = self.repo.get(ctx.organization_id, memory_id).await? else {
            return Ok(None);
        };
        let decision = check_memory_access(ctx, Some(&memory), Action::Read, team_memberships, sharing, Utc::now());
        Ok(if decision.allowed { Some(memory) } else { None })
    }

    pub async fn create(
        &self,
        ctx: &TenantContext,
        input: CreateMemoryInput,
    ) -> Result<Memory, MemoryServiceError> {
        let user_id = ctx.actor.user_id().unwrap_or_default();
        let required_permission = format!("memory:create:{}", input.scope.as_str());
        if !self
            .permissions
            .has_permission(user_id, ctx.organization_id, &required_permission)
            .await?
        {
            return Err(MemoryServiceError::PermissionDenied(required_permission));
        }

        let content_hash = compute_content_hash(&input.title, &input.content_preview);
        let now = Utc::now();
        let memory = Memory {
            id: memos_core::new_id(),
            organization_id: ctx.organization_id,
            owner_user_id: input.owner_user_id,
            scope: input.scope,
            scope_id: input.scope_id,
            memory_type: input.memory_type,
            classification: input.classification,
            required_clearance: input.required_clearance,
            title: input.title,
            content_preview: input.content_preview,
            content_hash,
            tags: input.tags.clone(),
            entities: input.entities,
            metadata: input.metadata,
            source_type: input.source_type,
            vector_id: input.vector_id,
            embedding_model: input.embedding_model,
            is_active: true,
            legal_hold: false,
            created_at: now,
            updated_at: now,
            access_count: 0,
            last_accessed_at: None,
        };

        self.repo.insert(memory.clone()).await?;

        let team_id = if memory.scope == Scope::Team {
            memory.scope_id
        } else {
            None
        };
        let payload = VectorPayload {
            memory_id: memory.id,
            organization_id: memory.organization_id,
            owner_id: memory.owner_user_id,
            scope: memory.scope,
            scope_id: memory.scope_id,
            team_id,
            tags: memory.tags.clone(),
            classification: memory.classification,
            memory_type: memory.memory_type,
            created_at: memory.created_at,
        };
        let _ = self.vector_index.upsert(payload, input.embedding).await;

        self.audit
            .record(
                AuditEvent::new(ctx, "memory.create", json!({ "memory_id": memory.id }))
                    .on_resource("memory", memory.id),
            )
            .await
            .ok();

        self.activation_repo
            .upsert(crate::model::ActivationState::default_for(memory.id))
            .await?;

        Ok(memory)
    }

    pub async fn update(
        &self,
        ctx: &TenantContext,
        memory_id: MemoryId,
        mutate: impl FnOnce(&mut Memory),
        team_memberships: &[TeamMembership],
        sharing: &[MemorySharing],
        embedding: Option<Vec<f32>>,
    ) -> Result<Memory, MemoryServiceError> {
        let existing = self
            .repo
            .get(ctx.organization_id, memory_id)
            .await?
            .ok_or(StoreError::NotFound)?;

        let decision = check_memory_access(
            ctx,
            Some(&existing),
            Action::Write,
            team_memberships,
            sharing,
            Utc::now(),
        );
        if !decision.allowed {
            return Err(MemoryServiceError::PermissionDenied(decision.reason));
        }

        let mut updated = existing.clone();
        mutate(&mut updated);
        updated.updated_at = Utc::now();

        let content_changed = updated.title != existing.title
            || updated.content_preview != existing.content_preview;
        if content_changed {
            updated.content_hash = compute_content_hash(&updated.title, &updated.content_preview);
        }
        let tags_or_classification_changed =
            updated.tags != existing.tags || updated.classification != existing.classification;

        self.repo.update(updated.clone()).await?;

        if content_changed || tags_or_classification_changed {
            let team_id = if updated.scope == Scope::Team {
                updated.scope_id
            } else {
                None
            };
            let payload = VectorPayload {
                memory_id: updated.id,
                organization_id: updated.organization_id,
                owner_id: updated.owner_user_id,
                scope: updated.scope,
                scope_id: updated.scope_id,
                team_id,
                tags: updated.tags.clone(),
                classification: updated.classification,
                memory_type: updated.memory_type,
                created_at: updated.created_at,
            };
            let _ = self
                .vector_index
                .upsert(payload, embedding.unwrap_or_default())
                .await;
        }

        self.audit
            .record(
                AuditEvent::new(
                    ctx,
                    "memory.update",
                    json!({
                        "memory_id": updated.id,
                        "content_changed": content_changed,
                    }),
                )
                .on_resource("memory", updated.id),
            )
            .await
            .ok();

        Ok(updated)
    }

    pub async fn soft_delete(
        &self,
        ctx: &TenantContext,
        memory_id: MemoryId,
        team_memberships: &[TeamMembership],
        sharing: &[MemorySharing],
    ) -> Result<(), MemoryServiceError> {
        let existing = self
            .repo
            .get(ctx.organization_id, memory_id)
            .await?
            .ok_or(StoreError::NotFound)?;

        let decision = check_memory_access(
            ctx,
            Some(&existing),
            Action::Delete,
            team_memberships,
            sharing,
            Utc::now(),
        );
        if !decision.allowed {
            return Err(MemoryServiceError::PermissionDenied(decision.reason));
        }
        if existing.legal_hold {
            return Err(StoreError::LegalHold.into());
        }

        let mut updated = existing;
        updated.is_active = false;
        updated.updated_at = Utc::now();
        self.repo.update(updated.clone()).await?;
        let _ = self
            .vector_index
            .delete(updated.organization_id, updated.id)
            .await;

        self.audit
            .record(
                AuditEvent::new(ctx, "memory.delete", json!({ "memory_id": updated.id }))
                    .on_resource("memory", updated.id),
            )
            .await
            .ok();

        Ok(())
    }

    /// Promotes a short-term memory to long-term once its access count
    /// crosses the configured threshold (§4.2 smart ingestion path).
    pub async fn promote_if_eligible(
        &self,
        memory: &Memory,
    ) -> Result<Option<Memory>, MemoryServiceError> {
        if memory.memory_type != MemoryType::ShortTerm {
            return Ok(None);
        }
        if memory.access_count < self.promotion_threshold {
            return Ok(None);
        }
        let mut promoted = memory.clone();
        promoted.memory_type = MemoryType::LongTerm;
        promoted.updated_at = Utc::now();
        self.repo.update(promoted.clone()).await?;
        Ok(Some(promoted))
    }
}

pub fn compute_content_hash(title: &str, content_preview: &str) -> String {
    memos_core::hashing::sha256_hex(&format!("{title}\u{0}{content_preview}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::{InMemoryActivationRepo, InMemoryMemoryRepo};
    use crate::vector_index::InMemoryVectorIndex;
    use async_trait::async_trait;
    use memos_audit::InMemoryAuditSink;
    use memos_permission::PermissionError;

    struct AllowAll;

    #[async_trait]
    impl PermissionChecker for AllowAll {
        async fn has_permission(
            &self,
            _user_id: UserId,
            _organization_id: OrganizationId,
            _requested: &str,
        ) -> Result<bool, PermissionError> {
            Ok(true)
        }
    }

    fn store() -> MemoryStore<InMemoryMemoryRepo, InMemoryActivationRepo, InMemoryVectorIndex, AllowAll>
    {
        MemoryStore::new(
            Arc::new(InMemoryMemoryRepo::default()),
            Arc::new(InMemoryActivationRepo::default()),
            Arc::new(InMemoryVectorIndex::default()),
            Arc::new(InMemoryAuditSink::default()),
            Arc::new(AllowAll),
        )
    }

    fn create_input() -> CreateMemoryInput {
        CreateMemoryInput {
            owner_user_id: memos_core::new_id(),
            scope: Scope::Personal,
            scope_id: None,
            memory_type: MemoryType::LongTerm,
            classification: Classification::Internal,
            required_clearance: 0,
            title: "ERR-404".into(),
            content_preview: "unrelated body".into(),
            tags: vec!["bug".into()],
            entities: HashMap::new(),
            metadata: json!({}),
            source_type: "manual".into(),
            vector_id: Some("v1".into()),
            embedding_model: Some("test-embed".into()),
            embedding: vec![1.0, 0.0],
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips_and_starts_at_zero_access() {
        let store = store();
        let org = memos_core::new_id();
        let ctx = TenantContext::for_user(memos_core::new_id(), org, vec![], 0);
        let memory = store.create(&ctx, create_input()).await.unwrap();
        assert_eq!(memory.access_count, 0);
        assert!(memory.is_active);

        let fetched = store.repo.get(org, memory.id).await.unwrap().unwrap();
        assert_eq!(fetched.content_hash, memory.content_hash);
    }

    #[tokio::test]
    async fn content_hash_is_stable_for_identical_content() {
        let a = compute_content_hash("title", "body");
        let b = compute_content_hash("title", "body");
        assert_eq!(a, b);
        let c = compute_content_hash("title", "different body");
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn soft_delete_rejected_under_legal_hold() {
        let store = store();
        let org = memos_core::new_id();
        let ctx = TenantContext::for_user(memos_core::new_id(), org, vec![], 0);
        let memory = store.create(&ctx, create_input()).await.unwrap();

        store
            .update(&ctx, memory.id, |m| m.legal_hold = true, &[], &[], None)
            .await
            .unwrap();

        let result = store.soft_delete(&ctx, memory.id, &[], &[]).await;
        assert!(matches!(
            result,
            Err(MemoryServiceError::Store(StoreError::LegalHold))
        ));
    }

    #[tokio::test]
    async fn promotion_requires_threshold() {
        let store = store();
        let mut input = create_input();
        input.memory_type = MemoryType::ShortTerm;
        let org = memos_core::new_id();
        let ctx = TenantContext::for_user(memos_core::new_id(), org, vec![], 0);
        let memory = store.create(&ctx, input).await.unwrap();

        assert!(store.promote_if_eligible(&memory).await.unwrap().is_none());

        let mut high_access = memory.clone();
        high_access.access_count = DEFAULT_PROMOTION_THRESHOLD;
        let promoted = store.promote_if_eligible(&high_access).await.unwrap().unwrap();
        assert_eq!(promoted.memory_type, MemoryType::LongTerm);
    }
}
