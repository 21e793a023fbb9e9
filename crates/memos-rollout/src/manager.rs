//! Staged rollout lifecycle (§4.7): `draft -> canary -> staged -> active ->
//! (superseded | rolled_back)`, plus auto-rollback on error rate.
//!
//! The full implementation only compiles with the `enterprise-rollout`
//! feature enabled. Without it, [`RolloutManager::new`] fails loud rather
//! than silently behaving as a no-op, since a disabled rollout manager that
//! appeared to work would be worse than one that plainly doesn't exist.

use crate::error::RolloutError;
use crate::model::{PolicyVersion, RolloutStatus};
use crate::repo::PolicyVersionRepo;
use memos_core::{OrganizationId, PolicyVersionId};
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_AUTO_ROLLBACK_THRESHOLD: f64 = 0.1;
pub const DEFAULT_MIN_EVALUATIONS: i64 = 100;

#[cfg(not(feature = "enterprise-rollout"))]
pub struct RolloutManager;

#[cfg(not(feature = "enterprise-rollout"))]
impl RolloutManager {
    pub fn new<R: PolicyVersionRepo + 'static>(_repo: Arc<R>) -> Result<Self, RolloutError> {
        Err(RolloutError::EnterpriseFeatureDisabled)
    }
}

#[cfg(feature = "enterprise-rollout")]
pub struct RolloutManager<R> {
    repo: Arc<R>,
}

#[cfg(feature = "enterprise-rollout")]
impl<R: PolicyVersionRepo> RolloutManager<R> {
    pub fn new(repo: Arc<R>) -> Result<Self, RolloutError> {
        Ok(Self { repo })
    }

    pub async fn create_policy_version(
        &self,
        organization_id: OrganizationId,
        policy_name: &str,
        policy_config: serde_json::Value,
    ) -> Result<PolicyVersion, RolloutError> {
        let version = self.repo.next_version(organization_id, policy_name).await?;
        let policy = PolicyVersion::draft(organization_id, policy_name, version, policy_config);
        self.repo.insert(policy.clone()).await?;
        Ok(policy)
    }

    pub async fn deploy_to_canary(&self, id: PolicyVersionId, canary_group_ids: Vec<Uuid>) -> Result<PolicyVersion, RolloutError> {
        let mut policy = self.get_or_not_found(id).await?;
        if policy.rollout_status != RolloutStatus::Draft {
            return Err(RolloutError::InvalidTransition(format!(
                "deploy_to_canary requires draft, found {:?}",
                policy.rollout_status
            )));
        }
        policy.rollout_status = RolloutStatus::Canary;
        policy.canary_group_ids = canary_group_ids;
        self.repo.update(policy.clone()).await?;
        Ok(policy)
    }

    pub async fn promote_to_staged(&self, id: PolicyVersionId, percentage: f64) -> Result<PolicyVersion, RolloutError> {
        if !(0.0..=1.0).contains(&percentage) {
            return Err(RolloutError::InvalidTransition(format!("rollout_percentage {percentage} out of [0,1]")));
        }
        let mut policy = self.get_or_not_found(id).await?;
        if !matches!(policy.rollout_status, RolloutStatus::Canary | RolloutStatus::Staged) {
            return Err(RolloutError::InvalidTransition(format!(
                "promote_to_staged requires canary or staged, found {:?}",
                policy.rollout_status
            )));
        }
        policy.rollout_status = RolloutStatus::Staged;
        policy.rollout_percentage = percentage;
        self.repo.update(policy.clone()).await?;
        Ok(policy)
    }

    pub async fn activate_fully(&self, id: PolicyVersionId) -> Result<PolicyVersion, RolloutError> {
        let mut policy = self.get_or_not_found(id).await?;
        if !matches!(policy.rollout_status, RolloutStatus::Canary | RolloutStatus::Staged) {
            return Err(RolloutError::InvalidTransition(format!(
                "activate_fully requires canary or staged, found {:?}",
                policy.rollout_status
            )));
        }

        let existing = self.repo.list_for_policy(policy.organization_id, &policy.policy_name).await?;
        for mut other in existing {
            if other.id != policy.id && other.rollout_status == RolloutStatus::Active {
                other.rollout_status = RolloutStatus::Superseded;
                other.superseded_by_version = Some(policy.version);
                self.repo.update(other).await?;
            }
        }

        policy.rollout_status = RolloutStatus::Active;
        policy.rollout_percentage = 1.0;
        policy.activated_at = Some(chrono::Utc::now());
        self.repo.update(policy.clone()).await?;
        Ok(policy)
    }

    pub async fn rollback(&self, id: PolicyVersionId, reason: &str, to_version: Option<i32>) -> Result<PolicyVersion, RolloutError> {
        let mut policy = self.get_or_not_found(id).await?;
        policy.rollout_status = RolloutStatus::RolledBack;
        policy.rollback_reason = Some(reason.to_string());
        policy.rolled_back_to_version = to_version;
        self.repo.update(policy.clone()).await?;

        let history = self.repo.list_for_policy(policy.organization_id, &policy.policy_name).await?;
        let target = match to_version {
            Some(version) => history.into_iter().find(|p| p.version == version),
            None => find_reactivation_target(&policy, history),
        };
        if let Some(mut target) = target {
            target.rollout_status = RolloutStatus::Active;
            target.superseded_by_version = None;
            target.activated_at = Some(chrono::Utc::now());
            self.repo.update(target).await?;
        }

        Ok(policy)
    }

    pub async fn record_evaluation(&self, id: PolicyVersionId, success: bool) -> Result<PolicyVersion, RolloutError> {
        let mut policy = self.get_or_not_found(id).await?;
        if success {
            policy.success_count += 1;
        } else {
            policy.failure_count += 1;
        }
        let total = policy.total_evaluations();
        policy.error_rate = if total == 0 { 0.0 } else { policy.failure_count as f64 / total as f64 };
        self.repo.update(policy.clone()).await?;
        Ok(policy)
    }

    pub async fn check_auto_rollback(&self, id: PolicyVersionId) -> Result<bool, RolloutError> {
        self.check_auto_rollback_with(id, DEFAULT_AUTO_ROLLBACK_THRESHOLD, DEFAULT_MIN_EVALUATIONS).await
    }

    pub async fn check_auto_rollback_with(&self, id: PolicyVersionId, threshold: f64, min_evaluations: i64) -> Result<bool, RolloutError> {
        let policy = self.get_or_not_found(id).await?;
        if policy.total_evaluations() < min_evaluations || policy.error_rate <= threshold {
            return Ok(false);
        }
        self.rollback(
            id,
            &format!("error_rate {:.4} exceeded threshold {threshold}", policy.error_rate),
            None,
        )
        .await?;
        Ok(true)
    }

    async fn get_or_not_found(&self, id: PolicyVersionId) -> Result<PolicyVersion, RolloutError> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| RolloutError::InvalidTransition("policy version not found".to_string()))
    }
}

/// Finds the version this one superseded, to reactivate when `rollback`
/// isn't given an explicit target. `policy` itself was never superseded by
/// anything (it's the version being rolled back), so the search has to walk
/// the policy's full version history for the entry that names `policy`'s
/// own version as its successor.
#[cfg(feature = "enterprise-rollout")]
fn find_reactivation_target(policy: &PolicyVersion, history: Vec<PolicyVersion>) -> Option<PolicyVersion> {
    history.into_iter().find(|p| p.superseded_by_version == Some(policy.version))
}
