//! Relational-metadata persistence contracts. The real implementation is a
//! Postgres pool with row-level security (§4.1); these traits plus the
//! in-memory fakes let `MemoryStore` be exercised without a database.

use crate::model::{ActivationState, Memory};
use async_trait::async_trait;
use memos_core::{MemoryId, OrganizationId};
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("memory not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("legal hold prevents deletion")]
    LegalHold,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait MemoryRepo: Send + Sync {
    async fn insert(&self, memory: Memory) -> Result<(), StoreError>;
    async fn update(&self, memory: Memory) -> Result<(), StoreError>;
    async fn get(
        &self,
        organization_id: OrganizationId,
        memory_id: MemoryId,
    ) -> Result<Option<Memory>, StoreError>;
    async fn get_many(
        &self,
        organization_id: OrganizationId,
        ids: &[MemoryId],
    ) -> Result<Vec<Memory>, StoreError>;
}

#[derive(Default)]
pub struct InMemoryMemoryRepo {
    rows: parking_lot::Mutex<HashMap<MemoryId, Memory>>,
}

#[async_trait]
impl MemoryRepo for InMemoryMemoryRepo {
    async fn insert(&self, memory: Memory) -> Result<(), StoreError> {
        let mut rows = self.rows.lock();
        if rows
            .values()
            .any(|m| m.organization_id == memory.organization_id && m.vector_id.is_some() && m.vector_id == memory.vector_id)
        {
            return Err(StoreError::Conflict(
                "(organization_id, vector_id) must be unique".into(),
            ));
        }
        rows.insert(memory.id, memory);
        Ok(())
    }

    async fn update(&self, memory: Memory) -> Result<(), StoreError> {
        let mut rows = self.rows.lock();
        if !rows.contains_key(&memory.id) {
            return Err(StoreError::NotFound);
        }
        rows.insert(memory.id, memory);
        Ok(())
    }

    async fn get(
        &self,
        organization_id: OrganizationId,
        memory_id: MemoryId,
    ) -> Result<Option<Memory>, StoreError> {
        Ok(self
            .rows
            .lock()
            .get(&memory_id)
            .filter(|m| m.organization_id == organization_id)
            .cloned())
    }

    async fn get_many(
        &self,
        organization_id: OrganizationId,
        ids: &[MemoryId],
    ) -> Result<Vec<Memory>, StoreError> {
        let rows = self.rows.lock();
        Ok(ids
            .iter()
            .filter_map(|id| rows.get(id))
            .filter(|m| m.organization_id == organization_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
pub trait ActivationRepo: Send + Sync {
    async fn get_or_default(&self, memory_id: MemoryId) -> Result<ActivationState, StoreError>;
    async fn upsert(&self, state: ActivationState) -> Result<(), StoreError>;
    async fn get_all(&self, memory_ids: &[MemoryId]) -> Result<Vec<ActivationState>, StoreError>;
}

#[derive(Default)]
pub struct InMemoryActivationRepo {
    rows: parking_lot::Mutex<HashMap<MemoryId, ActivationState>>,
}

#[async_trait]
impl ActivationRepo for InMemoryActivationRepo {
    async fn get_or_default(&self, memory_id: MemoryId) -> Result<ActivationState, StoreError> {
        Ok(self
            .rows
            .lock()
            .get(&memory_id)
            .cloned()
            .unwrap_or_else(|| ActivationState::default_for(memory_id)))
    }

    async fn upsert(&self, state: ActivationState) -> Result<(), StoreError> {
        self.rows.lock().insert(state.memory_id, state);
        Ok(())
    }

    async fn get_all(&self, memory_ids: &[MemoryId]) -> Result<Vec<ActivationState>, StoreError> {
        let rows = self.rows.lock();
        Ok(memory_ids
            .iter()
            .map(|id| {
                rows.get(id)
                    .cloned()
                    .unwrap_or_else(|| ActivationState::default_for(*id))
            })
            .collect())
    }
}
