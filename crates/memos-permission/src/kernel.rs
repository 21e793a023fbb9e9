//! The permission kernel object: resolves and caches effective permission
//! sets, and exposes `explain_access` for "why can I see this?" UI (§4.1).

use crate::model::{Role, UserRoleAssignment};
use crate::permission_set::EffectivePermissionSet;
use async_trait::async_trait;
use chrono::Utc;
use memos_core::error::{Classify, ErrorKind};
use memos_core::{OrganizationId, UserId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum PermissionError {
    #[error("role provider unavailable: {0}")]
    ProviderUnavailable(String),
}

impl Classify for PermissionError {
    fn kind(&self) -> ErrorKind {
        match self {
            PermissionError::ProviderUnavailable(_) => ErrorKind::UpstreamUnavailable,
        }
    }
}

/// Fetches role assignments and role definitions for a user in an
/// organization. The database-backed implementation is an external
/// collaborator; this trait is the contract the kernel depends on.
#[async_trait]
pub trait RoleProvider: Send + Sync {
    async fn assignments_for(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> Result<Vec<UserRoleAssignment>, PermissionError>;

    async fn roles_for(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<Role>, PermissionError>;
}

/// Static role book used before a database-backed provider is wired in.
/// Assignments and role definitions are seeded up front and never mutate.
#[derive(Default)]
pub struct InMemoryRoleProvider {
    assignments: Vec<UserRoleAssignment>,
    roles: Vec<Role>,
}

impl InMemoryRoleProvider {
    pub fn new(assignments: Vec<UserRoleAssignment>, roles: Vec<Role>) -> Self {
        Self { assignments, roles }
    }

    pub fn grant_all(organization_id: OrganizationId, user_id: UserId, role_id: memos_core::RoleId) -> Self {
        Self {
            assignments: vec![UserRoleAssignment { user_id, role_id, organization_id, expires_at: None }],
            roles: vec![Role { id: role_id, organization_id, name: "admin".to_string(), permissions: vec!["*:*".to_string()] }],
        }
    }
}

#[async_trait]
impl RoleProvider for InMemoryRoleProvider {
    async fn assignments_for(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> Result<Vec<UserRoleAssignment>, PermissionError> {
        Ok(self
            .assignments
            .iter()
            .filter(|a| a.user_id == user_id && a.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn roles_for(&self, organization_id: OrganizationId) -> Result<Vec<Role>, PermissionError> {
        Ok(self.roles.iter().filter(|r| r.organization_id == organization_id).cloned().collect())
    }
}

struct CacheEntry {
    set: EffectivePermissionSet,
    expires_at: Instant,
}

/// Short-TTL cache keyed by `(user, org)`, grounded on the teacher's
/// `ApiKeyStore` pattern (`server/gateway/src/auth.rs`): a plain
/// `parking_lot::Mutex<HashMap<_>>` is enough since lookups are cheap and
/// invalidation is explicit rather than LRU-based.
pub struct PermissionKernel<P: RoleProvider> {
    provider: P,
    cache: Mutex<HashMap<(UserId, OrganizationId), CacheEntry>>,
    ttl: Duration,
}

impl<P: RoleProvider> PermissionKernel<P> {
    pub fn new(provider: P, ttl: Duration) -> Self {
        Self {
            provider,
            cache: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn effective_permissions(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> Result<EffectivePermissionSet, PermissionError> {
        let key = (user_id, organization_id);
        if let Some(entry) = self.cache.lock().get(&key) {
            if entry.expires_at > Instant::now() {
                return Ok(entry.set.clone());
            }
        }

        let assignments = self.provider.assignments_for(user_id, organization_id).await?;
        let roles = self.provider.roles_for(organization_id).await?;
        let set = EffectivePermissionSet::compute(&assignments, &roles, Utc::now());

        self.cache.lock().insert(
            key,
            CacheEntry {
                set: set.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );

        Ok(set)
    }

    /// Explicit invalidation on role/share change (§4.1).
    pub fn invalidate(&self, user_id: UserId, organization_id: OrganizationId) {
        self.cache.lock().remove(&(user_id, organization_id));
    }

    pub async fn has_permission(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
        requested: &str,
    ) -> Result<bool, PermissionError> {
        let set = self.effective_permissions(user_id, organization_id).await?;
        Ok(set.allows(requested))
    }

    /// `explain_access`: the permission decision plus the user's resolved
    /// role list, for "why can I see this?" UI and audit (§4.1).
    pub async fn explain_access(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
        requested: &str,
    ) -> Result<AccessExplanation, PermissionError> {
        let set = self.effective_permissions(user_id, organization_id).await?;
        Ok(AccessExplanation {
            allowed: set.allows(requested),
            requested: requested.to_string(),
            roles: set.role_names.clone(),
        })
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AccessExplanation {
    pub allowed: bool,
    pub requested: String,
    pub roles: Vec<String>,
}

/// Object-safe facade over `PermissionKernel<P>` so downstream crates (memory
/// store, scheduler) can depend on `Arc<dyn PermissionChecker>` without
/// becoming generic over the role-provider implementation.
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    async fn has_permission(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
        requested: &str,
    ) -> Result<bool, PermissionError>;
}

#[async_trait]
impl<P: RoleProvider> PermissionChecker for PermissionKernel<P> {
    async fn has_permission(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
        requested: &str,
    ) -> Result<bool, PermissionError> {
        PermissionKernel::has_permission(self, user_id, organization_id, requested).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memos_core::new_id;

    struct StaticProvider {
        assignments: Vec<UserRoleAssignment>,
        roles: Vec<Role>,
    }

    #[async_trait]
    impl RoleProvider for StaticProvider {
        async fn assignments_for(
            &self,
            _user_id: UserId,
            _organization_id: OrganizationId,
        ) -> Result<Vec<UserRoleAssignment>, PermissionError> {
            Ok(self.assignments.clone())
        }

        async fn roles_for(
            &self,
            _organization_id: OrganizationId,
        ) -> Result<Vec<Role>, PermissionError> {
            Ok(self.roles.clone())
        }
    }

    #[tokio::test]
    async fn caches_until_invalidated() {
        let org = new_id();
        let user = new_id();
        let role_id = new_id();
        let provider = StaticProvider {
            assignments: vec![UserRoleAssignment {
                user_id: user,
                role_id,
                organization_id: org,
                expires_at: None,
            }],
            roles: vec![Role {
                id: role_id,
                organization_id: org,
                name: "member".into(),
                permissions: vec!["memory:read".into()],
            }],
        };
        let kernel = PermissionKernel::new(provider, Duration::from_secs(60));

        assert!(kernel.has_permission(user, org, "memory:read").await.unwrap());
        kernel.invalidate(user, org);
        assert!(kernel.has_permission(user, org, "memory:read").await.unwrap());
    }

    #[tokio::test]
    async fn explain_access_reports_roles() {
        let org = new_id();
        let user = new_id();
        let role_id = new_id();
        let provider = StaticProvider {
            assignments: vec![UserRoleAssignment {
                user_id: user,
                role_id,
                organization_id: org,
                expires_at: None,
            }],
            roles: vec![Role {
                id: role_id,
                organization_id: org,
                name: "org_admin".into(),
                permissions: vec!["*:*".into()],
            }],
        };
        let kernel = PermissionKernel::new(provider, Duration::from_secs(60));
        let explanation = kernel.explain_access(user, org, "pipeline:enqueue").await.unwrap();
        assert!(explanation.allowed);
        assert_eq!(explanation.roles, vec!["org_admin".to_string()]);
    }
}
