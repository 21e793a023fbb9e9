//! Snapshot metadata storage. Content bytes are handed back to the caller
//! directly rather than persisted here — this workspace has no blob/S3
//! collaborator to hand them to (§1 keeps object storage out of scope).

use crate::model::MemorySnapshot;
use async_trait::async_trait;
use memos_core::OrganizationId;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotRepoError {
    #[error("snapshot not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SnapshotRepo: Send + Sync {
    async fn insert(&self, snapshot: MemorySnapshot) -> Result<(), SnapshotRepoError>;
    async fn update(&self, snapshot: MemorySnapshot) -> Result<(), SnapshotRepoError>;
    async fn get(&self, organization_id: OrganizationId, id: Uuid) -> Result<Option<MemorySnapshot>, SnapshotRepoError>;
    async fn list(&self, organization_id: OrganizationId) -> Result<Vec<MemorySnapshot>, SnapshotRepoError>;
    async fn delete(&self, organization_id: OrganizationId, id: Uuid) -> Result<bool, SnapshotRepoError>;
}

#[derive(Default)]
pub struct InMemorySnapshotRepo {
    rows: parking_lot::Mutex<HashMap<Uuid, MemorySnapshot>>,
}

#[async_trait]
impl SnapshotRepo for InMemorySnapshotRepo {
    async fn insert(&self, snapshot: MemorySnapshot) -> Result<(), SnapshotRepoError> {
        self.rows.lock().insert(snapshot.id, snapshot);
        Ok(())
    }

    async fn update(&self, snapshot: MemorySnapshot) -> Result<(), SnapshotRepoError> {
        let mut rows = self.rows.lock();
        if !rows.contains_key(&snapshot.id) {
            return Err(SnapshotRepoError::NotFound);
        }
        rows.insert(snapshot.id, snapshot);
        Ok(())
    }

    async fn get(&self, organization_id: OrganizationId, id: Uuid) -> Result<Option<MemorySnapshot>, SnapshotRepoError> {
        Ok(self.rows.lock().get(&id).filter(|s| s.organization_id == organization_id).cloned())
    }

    async fn list(&self, organization_id: OrganizationId) -> Result<Vec<MemorySnapshot>, SnapshotRepoError> {
        let mut rows: Vec<_> = self.rows.lock().values().filter(|s| s.organization_id == organization_id).cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn delete(&self, organization_id: OrganizationId, id: Uuid) -> Result<bool, SnapshotRepoError> {
        let mut rows = self.rows.lock();
        if rows.get(&id).map(|s| s.organization_id == organization_id).unwrap_or(false) {
            rows.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }
}
