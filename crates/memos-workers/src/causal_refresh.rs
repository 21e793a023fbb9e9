//! Causal hypothesis refresh (§4.5): promotes the strongest co-activation
//! edges into `correlates` hypotheses.

use crate::error::WorkerError;
use memos_core::OrganizationId;
use memos_store::{refresh_hypothesis, CausalHypothesis, CausalHypothesisRepo, CoactivationRepo};

pub const DEFAULT_MIN_EDGE_WEIGHT: f64 = 0.25;
pub const RELATION_CORRELATES: &str = "correlates";

pub async fn refresh_causal_hypotheses(
    coactivation_repo: &dyn CoactivationRepo,
    causal_repo: &dyn CausalHypothesisRepo,
    organization_id: OrganizationId,
    limit: usize,
) -> Result<Vec<CausalHypothesis>, WorkerError> {
    refresh_causal_hypotheses_with(
        coactivation_repo,
        causal_repo,
        organization_id,
        limit,
        DEFAULT_MIN_EDGE_WEIGHT,
    )
    .await
}

pub async fn refresh_causal_hypotheses_with(
    coactivation_repo: &dyn CoactivationRepo,
    causal_repo: &dyn CausalHypothesisRepo,
    organization_id: OrganizationId,
    limit: usize,
    min_edge_weight: f64,
) -> Result<Vec<CausalHypothesis>, WorkerError> {
    let mut edges = coactivation_repo.list_all(organization_id).await?;
    edges.retain(|e| e.edge_weight >= min_edge_weight);
    edges.sort_by(|a, b| b.edge_weight.partial_cmp(&a.edge_weight).unwrap_or(std::cmp::Ordering::Equal));

    let mut refreshed = Vec::new();
    for edge in edges.into_iter().take(limit) {
        let hypothesis = refresh_hypothesis(
            causal_repo,
            organization_id,
            RELATION_CORRELATES,
            vec![edge.a, edge.b],
            edge.edge_weight,
        )
        .await?;
        refreshed.push(hypothesis);
    }
    Ok(refreshed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use memos_core::new_id;
    use memos_store::{InMemoryCausalHypothesisRepo, InMemoryCoactivationRepo};

    #[tokio::test]
    async fn only_promotes_edges_at_or_above_min_weight() {
        let coactivation_repo = InMemoryCoactivationRepo::default();
        let causal_repo = InMemoryCausalHypothesisRepo::default();
        let org = new_id();
        let now = chrono::Utc::now();

        let weak = (new_id(), new_id());
        let strong = (new_id(), new_id());
        coactivation_repo.record_with_window(org, weak.0, weak.1, now, 24).await.unwrap();
        for _ in 0..10 {
            coactivation_repo.record_with_window(org, strong.0, strong.1, now, 24).await.unwrap();
        }

        let hypotheses = refresh_causal_hypotheses(&coactivation_repo, &causal_repo, org, 10)
            .await
            .unwrap();
        assert_eq!(hypotheses.len(), 1);
        assert_eq!(hypotheses[0].relation, "correlates");
    }

    #[tokio::test]
    async fn respects_limit_and_orders_by_edge_weight_desc() {
        let coactivation_repo = InMemoryCoactivationRepo::default();
        let causal_repo = InMemoryCausalHypothesisRepo::default();
        let org = new_id();
        let now = chrono::Utc::now();

        for _ in 0..3 {
            let pair = (new_id(), new_id());
            for _ in 0..5 {
                coactivation_repo.record_with_window(org, pair.0, pair.1, now, 24).await.unwrap();
            }
        }

        let hypotheses = refresh_causal_hypotheses(&coactivation_repo, &causal_repo, org, 2)
            .await
            .unwrap();
        assert_eq!(hypotheses.len(), 2);
    }
}
