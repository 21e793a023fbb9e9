use crate::repo::RolloutStoreError;
use memos_core::error::{Classify, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum RolloutError {
    #[error(transparent)]
    Store(#[from] RolloutStoreError),
    #[error("invalid lifecycle transition: {0}")]
    InvalidTransition(String),
    #[error("the staged rollout manager is an enterprise feature; build with --features enterprise-rollout to enable it")]
    EnterpriseFeatureDisabled,
}

impl Classify for RolloutError {
    fn kind(&self) -> ErrorKind {
        match self {
            RolloutError::Store(RolloutStoreError::NotFound) => ErrorKind::NotFound,
            RolloutError::Store(RolloutStoreError::Unavailable(_)) => ErrorKind::UpstreamUnavailable,
            RolloutError::InvalidTransition(_) => ErrorKind::Conflict,
            RolloutError::EnterpriseFeatureDisabled => ErrorKind::Validation,
        }
    }
}
