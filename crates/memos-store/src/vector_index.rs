//! `VectorIndex`: the boundary to the external vector database (§1 -- "the
//! vector index's internal algorithm" is explicitly out of scope). This
//! trait is the dual-write target named in §4.2 Create/Update/Soft-delete;
//! the in-memory implementation below exists only so the store crate and its
//! callers are testable without a running vector service.

use crate::model::VectorPayload;
use async_trait::async_trait;
use memos_core::{MemoryId, OrganizationId};
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum VectorIndexError {
    #[error("vector index unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct VectorSearchHit {
    pub memory_id: MemoryId,
    pub score: f64,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(
        &self,
        payload: VectorPayload,
        embedding: Vec<f32>,
    ) -> Result<(), VectorIndexError>;

    async fn delete(
        &self,
        organization_id: OrganizationId,
        memory_id: MemoryId,
    ) -> Result<(), VectorIndexError>;

    async fn search(
        &self,
        organization_id: OrganizationId,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<VectorSearchHit>, VectorIndexError>;
}

struct IndexedVector {
    payload: VectorPayload,
    embedding: Vec<f32>,
}

/// Cosine-similarity in-process index for tests and local development. Real
/// deployments point at an external vector database partitioned by
/// `organization_id` (§6); this struct only honours that partitioning
/// contract, not any production-grade ANN algorithm.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    entries: parking_lot::Mutex<HashMap<(OrganizationId, MemoryId), IndexedVector>>,
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(
        &self,
        payload: VectorPayload,
        embedding: Vec<f32>,
    ) -> Result<(), VectorIndexError> {
        let key = (payload.organization_id, payload.memory_id);
        self.entries
            .lock()
            .insert(key, IndexedVector { payload, embedding });
        Ok(())
    }

    async fn delete(
        &self,
        organization_id: OrganizationId,
        memory_id: MemoryId,
    ) -> Result<(), VectorIndexError> {
        self.entries.lock().remove(&(organization_id, memory_id));
        Ok(())
    }

    async fn search(
        &self,
        organization_id: OrganizationId,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<VectorSearchHit>, VectorIndexError> {
        let entries = self.entries.lock();
        let mut hits: Vec<VectorSearchHit> = entries
            .iter()
            .filter(|((org, _), _)| *org == organization_id)
            .map(|((_, memory_id), indexed)| VectorSearchHit {
                memory_id: *memory_id,
                score: cosine_similarity(query_embedding, &indexed.embedding),
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Classification, MemoryType};
    use memos_core::new_id;

    fn payload(org: OrganizationId, memory_id: MemoryId) -> VectorPayload {
        VectorPayload {
            memory_id,
            organization_id: org,
            owner_id: new_id(),
            scope: memos_core::Scope::Personal,
            scope_id: None,
            team_id: None,
            tags: vec![],
            classification: Classification::Internal,
            memory_type: MemoryType::LongTerm,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn search_is_scoped_to_organization() {
        let index = InMemoryVectorIndex::default();
        let org_a = new_id();
        let org_b = new_id();
        let memory_a = new_id();
        let memory_b = new_id();

        index.upsert(payload(org_a, memory_a), vec![1.0, 0.0]).await.unwrap();
        index.upsert(payload(org_b, memory_b), vec![1.0, 0.0]).await.unwrap();

        let hits = index.search(org_a, &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].memory_id, memory_a);
    }

    #[tokio::test]
    async fn delete_removes_from_results() {
        let index = InMemoryVectorIndex::default();
        let org = new_id();
        let memory = new_id();
        index.upsert(payload(org, memory), vec![1.0, 0.0]).await.unwrap();
        index.delete(org, memory).await.unwrap();
        let hits = index.search(org, &[1.0, 0.0], 10).await.unwrap();
        assert!(hits.is_empty());
    }
}
