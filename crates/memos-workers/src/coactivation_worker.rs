//! Co-activation graph update (§4.5). Runs after a retrieval or agent batch
//! names a primary memory and the other memories that fired alongside it.

use crate::error::{with_retry, WorkerError};
use chrono::{DateTime, Utc};
use memos_core::{MemoryId, OrganizationId};
use memos_store::CoactivationRepo;

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY_MS: u64 = 50;
const DEFAULT_WINDOW_HOURS: i64 = 24;
const DEFAULT_TOP_N_PAIRS: usize = 10;

pub async fn update_coactivation(
    repo: &dyn CoactivationRepo,
    organization_id: OrganizationId,
    primary: MemoryId,
    co_ids: &[MemoryId],
    now: DateTime<Utc>,
) -> Result<(), WorkerError> {
    update_coactivation_with(
        repo,
        organization_id,
        primary,
        co_ids,
        now,
        DEFAULT_WINDOW_HOURS,
        DEFAULT_TOP_N_PAIRS,
    )
    .await
}

pub async fn update_coactivation_with(
    repo: &dyn CoactivationRepo,
    organization_id: OrganizationId,
    primary: MemoryId,
    co_ids: &[MemoryId],
    now: DateTime<Utc>,
    window_hours: i64,
    top_n_pairs: usize,
) -> Result<(), WorkerError> {
    for &co in co_ids {
        if co == primary {
            continue;
        }
        with_retry(MAX_ATTEMPTS, BASE_DELAY_MS, || async {
            repo.record_with_window(organization_id, primary, co, now, window_hours)
                .await
                .map(|_| ())
                .map_err(WorkerError::from)
        })
        .await?;
    }

    enforce_top_n(repo, organization_id, primary, top_n_pairs).await
}

async fn enforce_top_n(
    repo: &dyn CoactivationRepo,
    organization_id: OrganizationId,
    primary: MemoryId,
    top_n_pairs: usize,
) -> Result<(), WorkerError> {
    let mut edges = repo.neighbors(organization_id, primary).await?;
    edges.sort_by(|a, b| b.edge_weight.partial_cmp(&a.edge_weight).unwrap_or(std::cmp::Ordering::Equal));

    for edge in edges.into_iter().skip(top_n_pairs) {
        repo.remove(organization_id, edge.a, edge.b).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use memos_core::new_id;
    use memos_store::InMemoryCoactivationRepo;

    #[tokio::test]
    async fn updates_every_co_id_and_skips_self_pair() {
        let repo = InMemoryCoactivationRepo::default();
        let org = new_id();
        let primary = new_id();
        let a = new_id();
        let b = new_id();
        let now = Utc::now();

        update_coactivation(&repo, org, primary, &[a, b, primary], now).await.unwrap();

        let neighbors = repo.neighbors(org, primary).await.unwrap();
        assert_eq!(neighbors.len(), 2);
    }

    #[tokio::test]
    async fn top_n_pruning_keeps_strongest_edges_only() {
        let repo = InMemoryCoactivationRepo::default();
        let org = new_id();
        let primary = new_id();
        let now = Utc::now();

        let others: Vec<_> = (0..5).map(|_| new_id()).collect();
        for (i, &other) in others.iter().enumerate() {
            for _ in 0..=i {
                repo.record_with_window(org, primary, other, now, 24).await.unwrap();
            }
        }

        update_coactivation_with(&repo, org, primary, &[], now, 24, 2).await.unwrap();

        let neighbors = repo.neighbors(org, primary).await.unwrap();
        assert_eq!(neighbors.len(), 2);
        let strongest_two = &others[3..5];
        for edge in &neighbors {
            let other = if edge.a == primary { edge.b } else { edge.a };
            assert!(strongest_two.contains(&other));
        }
    }
}
