//! Persistence contracts for `AgentRun` rows and the cross-memory result
//! cache (§4.3 steps 5-6, 9-10). The real implementation is Postgres plus a
//! Redis-backed cache; these traits plus in-memory fakes exercise the runner
//! without either.

use crate::model::{AgentRun, CachedAgentOutput};
use async_trait::async_trait;
use chrono::Utc;
use memos_core::{MemoryId, OrganizationId};
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum AgentRepoError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Keyed by `(organization_id, memory_id, agent_name, agent_version)` per
/// §4.3 step 5.
#[async_trait]
pub trait AgentRunRepo: Send + Sync {
    async fn get(
        &self,
        organization_id: OrganizationId,
        memory_id: MemoryId,
        agent_name: &str,
        agent_version: &str,
    ) -> Result<Option<AgentRun>, AgentRepoError>;

    async fn upsert(&self, run: AgentRun) -> Result<(), AgentRepoError>;
}

#[derive(Default)]
pub struct InMemoryAgentRunRepo {
    rows: parking_lot::Mutex<HashMap<(OrganizationId, MemoryId, String, String), AgentRun>>,
}

#[async_trait]
impl AgentRunRepo for InMemoryAgentRunRepo {
    async fn get(
        &self,
        organization_id: OrganizationId,
        memory_id: MemoryId,
        agent_name: &str,
        agent_version: &str,
    ) -> Result<Option<AgentRun>, AgentRepoError> {
        let key = (
            organization_id,
            memory_id,
            agent_name.to_string(),
            agent_version.to_string(),
        );
        Ok(self.rows.lock().get(&key).cloned())
    }

    async fn upsert(&self, run: AgentRun) -> Result<(), AgentRepoError> {
        let key = (
            run.organization_id,
            run.memory_id,
            run.agent_name.clone(),
            run.agent_version.clone(),
        );
        self.rows.lock().insert(key, run);
        Ok(())
    }
}

/// Keyed by `cache_key` (§4.3 step 6), which deliberately excludes
/// `memory_id` so deterministic and LLM-strategy outputs can be reused
/// across memories with identical content/context.
#[async_trait]
pub trait AgentResultCacheRepo: Send + Sync {
    async fn get(&self, cache_key: &str) -> Result<Option<CachedAgentOutput>, AgentRepoError>;
    async fn set(&self, cache_key: String, value: CachedAgentOutput) -> Result<(), AgentRepoError>;
}

#[derive(Default)]
pub struct InMemoryAgentResultCacheRepo {
    rows: parking_lot::Mutex<HashMap<String, CachedAgentOutput>>,
}

#[async_trait]
impl AgentResultCacheRepo for InMemoryAgentResultCacheRepo {
    async fn get(&self, cache_key: &str) -> Result<Option<CachedAgentOutput>, AgentRepoError> {
        let rows = self.rows.lock();
        Ok(rows.get(cache_key).filter(|v| v.expires_at > Utc::now()).cloned())
    }

    async fn set(&self, cache_key: String, value: CachedAgentOutput) -> Result<(), AgentRepoError> {
        self.rows.lock().insert(cache_key, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AgentRunStatus;
    use chrono::Duration;
    use memos_core::new_id;
    use serde_json::json;

    fn sample_run(org: OrganizationId, mem: MemoryId) -> AgentRun {
        AgentRun {
            organization_id: org,
            memory_id: mem,
            agent_name: "classification".into(),
            agent_version: "v1".into(),
            inputs_hash: "abc".into(),
            status: AgentRunStatus::Success,
            confidence: 0.9,
            outputs: Default::default(),
            warnings: vec![],
            errors: vec![],
            started_at: Utc::now(),
            finished_at: Some(Utc::now()),
            trace_id: new_id(),
            provenance: json!({}),
        }
    }

    #[tokio::test]
    async fn run_repo_roundtrips_by_composite_key() {
        let repo = InMemoryAgentRunRepo::default();
        let org = new_id();
        let mem = new_id();
        repo.upsert(sample_run(org, mem)).await.unwrap();

        let fetched = repo.get(org, mem, "classification", "v1").await.unwrap();
        assert!(fetched.is_some());
        assert!(repo.get(org, mem, "classification", "v2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cache_entries_expire() {
        let cache = InMemoryAgentResultCacheRepo::default();
        cache
            .set(
                "key-1".into(),
                CachedAgentOutput {
                    outputs: Default::default(),
                    confidence: 0.5,
                    expires_at: Utc::now() - Duration::seconds(1),
                },
            )
            .await
            .unwrap();

        assert!(cache.get("key-1").await.unwrap().is_none());
    }
}
