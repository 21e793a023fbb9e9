//! Nightly decay (§4.5): clamps drifted `ActivationState` fields,
//! renormalizes co-activation edge weights, and prunes weak, stale edges.

use crate::error::WorkerError;
use chrono::{DateTime, Utc};
use memos_core::{MemoryId, OrganizationId};
use memos_store::{ActivationRepo, CoactivationRepo};
use serde::Serialize;

pub const DEFAULT_PRUNE_MIN_WEIGHT: f64 = 0.01;
pub const DEFAULT_PRUNE_OLDER_THAN_DAYS: i64 = 90;

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct DecayReport {
    pub states_clamped: usize,
    pub edges_renormalized: usize,
    pub edges_pruned: usize,
}

pub async fn run_nightly_decay(
    activation_repo: &dyn ActivationRepo,
    coactivation_repo: &dyn CoactivationRepo,
    organization_id: OrganizationId,
    memory_ids: &[MemoryId],
    now: DateTime<Utc>,
) -> Result<DecayReport, WorkerError> {
    run_nightly_decay_with(
        activation_repo,
        coactivation_repo,
        organization_id,
        memory_ids,
        now,
        DEFAULT_PRUNE_MIN_WEIGHT,
        DEFAULT_PRUNE_OLDER_THAN_DAYS,
    )
    .await
}

pub async fn run_nightly_decay_with(
    activation_repo: &dyn ActivationRepo,
    coactivation_repo: &dyn CoactivationRepo,
    organization_id: OrganizationId,
    memory_ids: &[MemoryId],
    now: DateTime<Utc>,
    prune_min_weight: f64,
    prune_older_than_days: i64,
) -> Result<DecayReport, WorkerError> {
    let mut report = DecayReport::default();

    // Step 1: clamp every ActivationState to its valid range.
    let mut states = activation_repo.get_all(memory_ids).await?;
    for state in &mut states {
        state.clamp();
        activation_repo.upsert(state.clone()).await?;
        report.states_clamped += 1;
    }

    // Step 2: renormalize edge weights in case drift accumulated.
    let mut edges = coactivation_repo.list_all(organization_id).await?;
    for edge in &mut edges {
        edge.renormalize();
        coactivation_repo.replace(edge.clone()).await?;
        report.edges_renormalized += 1;
    }

    // Step 3: prune edges that are both weak and stale.
    let cutoff = now - chrono::Duration::days(prune_older_than_days);
    for edge in edges {
        if edge.edge_weight < prune_min_weight && edge.last_coactivated_at < cutoff {
            coactivation_repo.remove(organization_id, edge.a, edge.b).await?;
            report.edges_pruned += 1;
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use memos_core::new_id;
    use memos_store::{ActivationState, InMemoryActivationRepo, InMemoryCoactivationRepo};

    #[tokio::test]
    async fn clamps_out_of_range_activation_fields() {
        let activation_repo = InMemoryActivationRepo::default();
        let coactivation_repo = InMemoryCoactivationRepo::default();
        let org = new_id();
        let memory_id = new_id();

        let mut state = ActivationState::default_for(memory_id);
        state.base_importance = 1.7;
        state.risk_factor = -0.3;
        state.access_count = -4;
        activation_repo.upsert(state).await.unwrap();

        let report = run_nightly_decay(&activation_repo, &coactivation_repo, org, &[memory_id], Utc::now())
            .await
            .unwrap();
        assert_eq!(report.states_clamped, 1);

        let clamped = activation_repo.get_or_default(memory_id).await.unwrap();
        assert_eq!(clamped.base_importance, 1.0);
        assert_eq!(clamped.risk_factor, 0.0);
        assert_eq!(clamped.access_count, 0);
    }

    #[tokio::test]
    async fn prunes_weak_and_stale_edges_only() {
        let activation_repo = InMemoryActivationRepo::default();
        let coactivation_repo = InMemoryCoactivationRepo::default();
        let org = new_id();
        let now = Utc::now();

        let stale_weak = (new_id(), new_id());
        let fresh_weak = (new_id(), new_id());
        let strong = (new_id(), new_id());

        coactivation_repo
            .record_with_window(org, stale_weak.0, stale_weak.1, now - chrono::Duration::days(100), 24)
            .await
            .unwrap();
        coactivation_repo
            .record_with_window(org, fresh_weak.0, fresh_weak.1, now, 24)
            .await
            .unwrap();
        for _ in 0..20 {
            coactivation_repo.record_with_window(org, strong.0, strong.1, now, 24).await.unwrap();
        }

        let report = run_nightly_decay(&activation_repo, &coactivation_repo, org, &[], now)
            .await
            .unwrap();
        assert_eq!(report.edges_pruned, 1);

        let remaining = coactivation_repo.list_all(org).await.unwrap();
        assert_eq!(remaining.len(), 2);
    }
}
