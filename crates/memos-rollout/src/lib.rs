//! Staged rollout manager (C11, §4.7). Gated behind the `enterprise-rollout`
//! Cargo feature: without it, [`RolloutManager::new`] returns
//! [`RolloutError::EnterpriseFeatureDisabled`] instead of silently no-op'ing.

pub mod error;
pub mod manager;
pub mod model;
pub mod repo;

pub use error::RolloutError;
pub use manager::{RolloutManager, DEFAULT_AUTO_ROLLBACK_THRESHOLD, DEFAULT_MIN_EVALUATIONS};
pub use model::{PolicyVersion, RolloutStatus};
pub use repo::{InMemoryPolicyVersionRepo, PolicyVersionRepo, RolloutStoreError};
