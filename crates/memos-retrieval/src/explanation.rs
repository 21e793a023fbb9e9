//! Append-only sink for `RetrievalExplanation` rows (§4.2: "the write is
//! part of the request's transaction; persistence is mandatory").

use crate::model::RetrievalExplanation;
use async_trait::async_trait;
use memos_core::error::{Classify, ErrorKind};
use memos_core::OrganizationId;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum ExplanationError {
    #[error("explanation log unavailable: {0}")]
    Unavailable(String),
}

impl Classify for ExplanationError {
    fn kind(&self) -> ErrorKind {
        match self {
            ExplanationError::Unavailable(_) => ErrorKind::UpstreamUnavailable,
        }
    }
}

#[async_trait]
pub trait ExplanationSink: Send + Sync {
    async fn record(&self, explanation: RetrievalExplanation) -> Result<(), ExplanationError>;
    async fn get(
        &self,
        organization_id: OrganizationId,
        id: uuid::Uuid,
    ) -> Result<Option<RetrievalExplanation>, ExplanationError>;
    async fn list_recent(
        &self,
        organization_id: OrganizationId,
        limit: usize,
    ) -> Result<Vec<RetrievalExplanation>, ExplanationError>;
}

#[derive(Default)]
pub struct InMemoryExplanationSink {
    rows: Mutex<HashMap<OrganizationId, Vec<RetrievalExplanation>>>,
}

#[async_trait]
impl ExplanationSink for InMemoryExplanationSink {
    async fn record(&self, explanation: RetrievalExplanation) -> Result<(), ExplanationError> {
        self.rows
            .lock()
            .entry(explanation.organization_id)
            .or_default()
            .push(explanation);
        Ok(())
    }

    async fn get(
        &self,
        organization_id: OrganizationId,
        id: uuid::Uuid,
    ) -> Result<Option<RetrievalExplanation>, ExplanationError> {
        Ok(self
            .rows
            .lock()
            .get(&organization_id)
            .and_then(|rows| rows.iter().find(|r| r.id == id).cloned()))
    }

    async fn list_recent(
        &self,
        organization_id: OrganizationId,
        limit: usize,
    ) -> Result<Vec<RetrievalExplanation>, ExplanationError> {
        let rows = self.rows.lock();
        let mut entries = rows.get(&organization_id).cloned().unwrap_or_default();
        entries.sort_by(|a, b| b.retrieved_at.cmp(&a.retrieved_at));
        entries.truncate(limit);
        Ok(entries)
    }
}
