//! `CausalHypothesis` storage (§3, §4.5 causal hypothesis refresh). Written
//! by the maintenance worker that promotes strong co-activation edges;
//! read by whatever surfaces "this might be related" suggestions.

use async_trait::async_trait;
use memos_core::{MemoryId, OrganizationId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HypothesisStatus {
    Proposed,
    Active,
    Contested,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CausalHypothesis {
    pub id: Uuid,
    pub organization_id: OrganizationId,
    pub relation: String,
    /// Sorted.
    pub evidence_memory_ids: Vec<MemoryId>,
    pub confidence: f64,
    pub status: HypothesisStatus,
}

impl CausalHypothesis {
    pub fn new(
        organization_id: OrganizationId,
        relation: impl Into<String>,
        mut evidence_memory_ids: Vec<MemoryId>,
        confidence: f64,
    ) -> Self {
        evidence_memory_ids.sort();
        Self {
            id: Uuid::new_v4(),
            organization_id,
            relation: relation.into(),
            evidence_memory_ids,
            confidence,
            status: HypothesisStatus::Proposed,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CausalHypothesisError {
    #[error("causal hypothesis store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait CausalHypothesisRepo: Send + Sync {
    /// Looks up a non-rejected hypothesis by its natural key
    /// `(organization_id, relation, evidence_memory_ids)`.
    async fn find_active(
        &self,
        organization_id: OrganizationId,
        relation: &str,
        evidence_memory_ids: &[MemoryId],
    ) -> Result<Option<CausalHypothesis>, CausalHypothesisError>;

    async fn upsert(&self, hypothesis: CausalHypothesis) -> Result<(), CausalHypothesisError>;

    async fn list_for_org(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<CausalHypothesis>, CausalHypothesisError>;
}

/// Applies the §4.5 upsert rule: a matching non-rejected row has its
/// confidence raised to the max observed and a `contested` status resurrects
/// to `proposed`; no match inserts `observed` as a fresh `proposed` row.
pub async fn refresh_hypothesis(
    repo: &dyn CausalHypothesisRepo,
    organization_id: OrganizationId,
    relation: &str,
    evidence_memory_ids: Vec<MemoryId>,
    observed_confidence: f64,
) -> Result<CausalHypothesis, CausalHypothesisError> {
    let existing = repo
        .find_active(organization_id, relation, &evidence_memory_ids)
        .await?;

    let hypothesis = match existing {
        Some(mut hypothesis) => {
            hypothesis.confidence = hypothesis.confidence.max(observed_confidence);
            if hypothesis.status == HypothesisStatus::Contested {
                hypothesis.status = HypothesisStatus::Proposed;
            }
            hypothesis
        }
        None => CausalHypothesis::new(organization_id, relation, evidence_memory_ids, observed_confidence),
    };

    repo.upsert(hypothesis.clone()).await?;
    Ok(hypothesis)
}

#[derive(Default)]
pub struct InMemoryCausalHypothesisRepo {
    rows: parking_lot::Mutex<HashMap<Uuid, CausalHypothesis>>,
}

#[async_trait]
impl CausalHypothesisRepo for InMemoryCausalHypothesisRepo {
    async fn find_active(
        &self,
        organization_id: OrganizationId,
        relation: &str,
        evidence_memory_ids: &[MemoryId],
    ) -> Result<Option<CausalHypothesis>, CausalHypothesisError> {
        let mut sorted = evidence_memory_ids.to_vec();
        sorted.sort();
        Ok(self
            .rows
            .lock()
            .values()
            .find(|h| {
                h.organization_id == organization_id
                    && h.relation == relation
                    && h.evidence_memory_ids == sorted
                    && h.status != HypothesisStatus::Rejected
            })
            .cloned())
    }

    async fn upsert(&self, hypothesis: CausalHypothesis) -> Result<(), CausalHypothesisError> {
        self.rows.lock().insert(hypothesis.id, hypothesis);
        Ok(())
    }

    async fn list_for_org(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<CausalHypothesis>, CausalHypothesisError> {
        Ok(self
            .rows
            .lock()
            .values()
            .filter(|h| h.organization_id == organization_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memos_core::new_id;

    #[tokio::test]
    async fn refresh_raises_confidence_to_max_observed() {
        let repo = InMemoryCausalHypothesisRepo::default();
        let org = new_id();
        let pair = vec![new_id(), new_id()];

        let first = refresh_hypothesis(&repo, org, "correlates", pair.clone(), 0.3).await.unwrap();
        assert_eq!(first.confidence, 0.3);

        let second = refresh_hypothesis(&repo, org, "correlates", pair.clone(), 0.6).await.unwrap();
        assert_eq!(second.confidence, 0.6);
        assert_eq!(second.id, first.id);

        let unchanged = refresh_hypothesis(&repo, org, "correlates", pair, 0.1).await.unwrap();
        assert_eq!(unchanged.confidence, 0.6);
    }

    #[tokio::test]
    async fn refresh_resurrects_contested_to_proposed() {
        let repo = InMemoryCausalHypothesisRepo::default();
        let org = new_id();
        let pair = vec![new_id(), new_id()];

        let mut hypothesis = refresh_hypothesis(&repo, org, "correlates", pair.clone(), 0.4).await.unwrap();
        hypothesis.status = HypothesisStatus::Contested;
        repo.upsert(hypothesis).await.unwrap();

        let refreshed = refresh_hypothesis(&repo, org, "correlates", pair, 0.5).await.unwrap();
        assert_eq!(refreshed.status, HypothesisStatus::Proposed);
    }

    #[tokio::test]
    async fn rejected_hypothesis_is_not_matched_by_find_active() {
        let repo = InMemoryCausalHypothesisRepo::default();
        let org = new_id();
        let pair = vec![new_id(), new_id()];
        let mut hypothesis = refresh_hypothesis(&repo, org, "correlates", pair.clone(), 0.4).await.unwrap();
        hypothesis.status = HypothesisStatus::Rejected;
        repo.upsert(hypothesis).await.unwrap();

        assert!(repo.find_active(org, "correlates", &pair).await.unwrap().is_none());
    }
}
