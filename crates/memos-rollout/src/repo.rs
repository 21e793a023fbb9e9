//! Storage for policy versions, keyed by `(organization_id, policy_name)`
//! history. The invariant "at most one active row per (org, policy_name)"
//! is enforced by the manager, not the repository.

use crate::model::PolicyVersion;
use async_trait::async_trait;
use memos_core::{OrganizationId, PolicyVersionId};
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum RolloutStoreError {
    #[error("policy version not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait PolicyVersionRepo: Send + Sync {
    async fn insert(&self, policy: PolicyVersion) -> Result<(), RolloutStoreError>;
    async fn update(&self, policy: PolicyVersion) -> Result<(), RolloutStoreError>;
    async fn get(&self, id: PolicyVersionId) -> Result<Option<PolicyVersion>, RolloutStoreError>;
    async fn list_for_policy(&self, organization_id: OrganizationId, policy_name: &str) -> Result<Vec<PolicyVersion>, RolloutStoreError>;

    async fn next_version(&self, organization_id: OrganizationId, policy_name: &str) -> Result<i32, RolloutStoreError> {
        let versions = self.list_for_policy(organization_id, policy_name).await?;
        Ok(versions.iter().map(|v| v.version).max().unwrap_or(0) + 1)
    }
}

#[derive(Default)]
pub struct InMemoryPolicyVersionRepo {
    rows: parking_lot::Mutex<HashMap<PolicyVersionId, PolicyVersion>>,
}

#[async_trait]
impl PolicyVersionRepo for InMemoryPolicyVersionRepo {
    async fn insert(&self, policy: PolicyVersion) -> Result<(), RolloutStoreError> {
        self.rows.lock().insert(policy.id, policy);
        Ok(())
    }

    async fn update(&self, policy: PolicyVersion) -> Result<(), RolloutStoreError> {
        let mut rows = self.rows.lock();
        if !rows.contains_key(&policy.id) {
            return Err(RolloutStoreError::NotFound);
        }
        rows.insert(policy.id, policy);
        Ok(())
    }

    async fn get(&self, id: PolicyVersionId) -> Result<Option<PolicyVersion>, RolloutStoreError> {
        Ok(self.rows.lock().get(&id).cloned())
    }

    async fn list_for_policy(&self, organization_id: OrganizationId, policy_name: &str) -> Result<Vec<PolicyVersion>, RolloutStoreError> {
        Ok(self
            .rows
            .lock()
            .values()
            .filter(|p| p.organization_id == organization_id && p.policy_name == policy_name)
            .cloned()
            .collect())
    }
}
