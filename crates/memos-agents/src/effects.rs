//! Side-effect materialization stores for the non-graph agents (§4.3 step
//! 8): topics, patterns, the Logseq export record, and the
//! `FeedbackLearningConfig` an accepted feedback-learning run mutates.
//! `GraphLinkingAgent`'s edges go straight through
//! `memos_store::CoactivationRepo` instead since that's the system of
//! record retrieval already reads from.

use async_trait::async_trait;
use memos_core::{MemoryId, OrganizationId, Scope};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnrichmentKind {
    Topics,
    Patterns,
    LogseqExport,
}

impl EnrichmentKind {
    fn as_str(&self) -> &'static str {
        match self {
            EnrichmentKind::Topics => "topics",
            EnrichmentKind::Patterns => "patterns",
            EnrichmentKind::LogseqExport => "logseq_export",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnrichmentRecord {
    pub organization_id: OrganizationId,
    pub memory_id: MemoryId,
    pub scope: Scope,
    pub scope_id: Option<uuid::Uuid>,
    pub items: Vec<Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum EffectsError {
    #[error("enrichment store unavailable: {0}")]
    Unavailable(String),
}

/// Scope/scope_id-aware upsert for the handful of enrichment kinds that are
/// just "replace this memory's rows of this kind".
#[async_trait]
pub trait EnrichmentRepo: Send + Sync {
    async fn upsert(
        &self,
        kind: EnrichmentKind,
        record: EnrichmentRecord,
    ) -> Result<(), EffectsError>;

    async fn get(
        &self,
        kind: EnrichmentKind,
        organization_id: OrganizationId,
        memory_id: MemoryId,
    ) -> Result<Option<EnrichmentRecord>, EffectsError>;
}

#[derive(Default)]
pub struct InMemoryEnrichmentRepo {
    rows: parking_lot::Mutex<HashMap<(&'static str, OrganizationId, MemoryId), EnrichmentRecord>>,
}

#[async_trait]
impl EnrichmentRepo for InMemoryEnrichmentRepo {
    async fn upsert(
        &self,
        kind: EnrichmentKind,
        record: EnrichmentRecord,
    ) -> Result<(), EffectsError> {
        let key = (kind.as_str(), record.organization_id, record.memory_id);
        self.rows.lock().insert(key, record);
        Ok(())
    }

    async fn get(
        &self,
        kind: EnrichmentKind,
        organization_id: OrganizationId,
        memory_id: MemoryId,
    ) -> Result<Option<EnrichmentRecord>, EffectsError> {
        let key = (kind.as_str(), organization_id, memory_id);
        Ok(self.rows.lock().get(&key).cloned())
    }
}

/// The tunables a `FeedbackLearningAgent` run is allowed to nudge (§4.3 step
/// 8, §4.6 "policy gate"). Diffs are small deltas, not full replacements, so
/// a malformed or over-eager run can't reset the whole config.
#[derive(Debug, Clone, Default)]
pub struct FeedbackLearningConfig {
    pub stopwords: Vec<String>,
    pub thresholds: HashMap<String, f64>,
    pub weights: HashMap<String, f64>,
}

#[async_trait]
pub trait FeedbackLearningConfigRepo: Send + Sync {
    async fn get(&self, organization_id: OrganizationId) -> Result<FeedbackLearningConfig, EffectsError>;

    /// Applies an additive diff gated by the caller's policy check; the repo
    /// itself does not decide whether the gate is open.
    async fn apply_diff(
        &self,
        organization_id: OrganizationId,
        diff: &Value,
    ) -> Result<FeedbackLearningConfig, EffectsError>;
}

#[derive(Default)]
pub struct InMemoryFeedbackLearningConfigRepo {
    rows: parking_lot::Mutex<HashMap<OrganizationId, FeedbackLearningConfig>>,
}

#[async_trait]
impl FeedbackLearningConfigRepo for InMemoryFeedbackLearningConfigRepo {
    async fn get(&self, organization_id: OrganizationId) -> Result<FeedbackLearningConfig, EffectsError> {
        Ok(self.rows.lock().get(&organization_id).cloned().unwrap_or_default())
    }

    async fn apply_diff(
        &self,
        organization_id: OrganizationId,
        diff: &Value,
    ) -> Result<FeedbackLearningConfig, EffectsError> {
        let mut rows = self.rows.lock();
        let config = rows.entry(organization_id).or_default();

        if let Some(added) = diff.get("add_stopwords").and_then(|v| v.as_array()) {
            for word in added {
                if let Some(word) = word.as_str() {
                    if !config.stopwords.iter().any(|w| w == word) {
                        config.stopwords.push(word.to_string());
                    }
                }
            }
        }
        if let Some(thresholds) = diff.get("thresholds").and_then(|v| v.as_object()) {
            for (key, value) in thresholds {
                if let Some(value) = value.as_f64() {
                    config.thresholds.insert(key.clone(), value);
                }
            }
        }
        if let Some(weights) = diff.get("weights").and_then(|v| v.as_object()) {
            for (key, value) in weights {
                if let Some(value) = value.as_f64() {
                    config.weights.insert(key.clone(), value);
                }
            }
        }

        Ok(config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memos_core::new_id;
    use serde_json::json;

    #[tokio::test]
    async fn enrichment_upsert_replaces_prior_record_for_same_key() {
        let repo = InMemoryEnrichmentRepo::default();
        let org = new_id();
        let mem = new_id();
        repo.upsert(
            EnrichmentKind::Topics,
            EnrichmentRecord {
                organization_id: org,
                memory_id: mem,
                scope: Scope::Personal,
                scope_id: None,
                items: vec![json!("first")],
            },
        )
        .await
        .unwrap();
        repo.upsert(
            EnrichmentKind::Topics,
            EnrichmentRecord {
                organization_id: org,
                memory_id: mem,
                scope: Scope::Personal,
                scope_id: None,
                items: vec![json!("second")],
            },
        )
        .await
        .unwrap();

        let stored = repo.get(EnrichmentKind::Topics, org, mem).await.unwrap().unwrap();
        assert_eq!(stored.items, vec![json!("second")]);
    }

    #[tokio::test]
    async fn feedback_config_diff_is_additive() {
        let repo = InMemoryFeedbackLearningConfigRepo::default();
        let org = new_id();
        repo.apply_diff(org, &json!({"add_stopwords": ["the"]})).await.unwrap();
        let config = repo
            .apply_diff(org, &json!({"add_stopwords": ["the", "a"], "weights": {"rel": 0.4}}))
            .await
            .unwrap();

        assert_eq!(config.stopwords, vec!["the".to_string(), "a".to_string()]);
        assert_eq!(config.weights.get("rel"), Some(&0.4));
    }
}
