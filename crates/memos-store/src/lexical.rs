//! Lexical (full-text) leg of hybrid search (§4.2 Search, leg 2). Field
//! weights mirror the spec's cover-density ranking: title A=1.0, content
//! B=0.4, tags D=0.1.

use crate::model::Memory;
use async_trait::async_trait;
use memos_core::{MemoryId, OrganizationId};
use std::collections::HashMap;

pub const FIELD_WEIGHT_TITLE: f64 = 1.0;
pub const FIELD_WEIGHT_CONTENT: f64 = 0.4;
pub const FIELD_WEIGHT_TAGS: f64 = 0.1;

#[derive(Debug, thiserror::Error)]
pub enum LexicalIndexError {
    #[error("lexical index unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct LexicalSearchHit {
    pub memory_id: MemoryId,
    pub score: f64,
}

#[async_trait]
pub trait LexicalIndex: Send + Sync {
    async fn index(&self, memory: &Memory) -> Result<(), LexicalIndexError>;
    async fn remove(&self, organization_id: OrganizationId, memory_id: MemoryId) -> Result<(), LexicalIndexError>;
    async fn search(
        &self,
        organization_id: OrganizationId,
        query: &str,
        limit: usize,
    ) -> Result<Vec<LexicalSearchHit>, LexicalIndexError>;
}

#[derive(Clone)]
struct IndexedDocument {
    organization_id: OrganizationId,
    title: String,
    content_preview: String,
    tags: Vec<String>,
}

/// Simple term-overlap ranker with field weighting and length normalization,
/// standing in for a real `tsvector`/BM25 engine.
#[derive(Default)]
pub struct InMemoryLexicalIndex {
    docs: parking_lot::Mutex<HashMap<MemoryId, IndexedDocument>>,
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

fn field_score(field_tokens: &[String], query_tokens: &[String], weight: f64) -> f64 {
    if field_tokens.is_empty() || query_tokens.is_empty() {
        return 0.0;
    }
    let matches = query_tokens
        .iter()
        .filter(|q| field_tokens.contains(q))
        .count() as f64;
    // Length normalization: longer fields dilute a fixed number of matches.
    weight * matches / (field_tokens.len() as f64).sqrt()
}

#[async_trait]
impl LexicalIndex for InMemoryLexicalIndex {
    async fn index(&self, memory: &Memory) -> Result<(), LexicalIndexError> {
        self.docs.lock().insert(
            memory.id,
            IndexedDocument {
                organization_id: memory.organization_id,
                title: memory.title.clone(),
                content_preview: memory.content_preview.clone(),
                tags: memory.tags.clone(),
            },
        );
        Ok(())
    }

    async fn remove(&self, _organization_id: OrganizationId, memory_id: MemoryId) -> Result<(), LexicalIndexError> {
        self.docs.lock().remove(&memory_id);
        Ok(())
    }

    async fn search(
        &self,
        organization_id: OrganizationId,
        query: &str,
        limit: usize,
    ) -> Result<Vec<LexicalSearchHit>, LexicalIndexError> {
        let query_tokens = tokenize(query);
        let docs = self.docs.lock();
        let mut hits: Vec<LexicalSearchHit> = docs
            .iter()
            .filter(|(_, doc)| doc.organization_id == organization_id)
            .map(|(id, doc)| {
                let title_score = field_score(&tokenize(&doc.title), &query_tokens, FIELD_WEIGHT_TITLE);
                let content_score =
                    field_score(&tokenize(&doc.content_preview), &query_tokens, FIELD_WEIGHT_CONTENT);
                let tags_score = field_score(&doc.tags, &query_tokens, FIELD_WEIGHT_TAGS);
                LexicalSearchHit {
                    memory_id: *id,
                    score: title_score + content_score + tags_score,
                }
            })
            .filter(|hit| hit.score > 0.0)
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Classification, MemoryType};
    use memos_core::{new_id, Scope};
    use std::collections::HashMap as Map;

    fn memory(org: OrganizationId, title: &str, content: &str, tags: Vec<String>) -> Memory {
        Memory {
            id: new_id(),
            organization_id: org,
            owner_user_id: new_id(),
            scope: Scope::Personal,
            scope_id: None,
            memory_type: MemoryType::LongTerm,
            classification: Classification::Internal,
            required_clearance: 0,
            title: title.to_string(),
            content_preview: content.to_string(),
            content_hash: "hash".into(),
            tags,
            entities: Map::new(),
            metadata: serde_json::json!({}),
            source_type: "manual".into(),
            vector_id: None,
            embedding_model: None,
            is_active: true,
            legal_hold: false,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            access_count: 0,
            last_accessed_at: None,
        }
    }

    #[tokio::test]
    async fn title_match_outranks_content_only_match() {
        let index = InMemoryLexicalIndex::default();
        let org = new_id();
        let title_hit = memory(org, "database outage", "unrelated body text", vec![]);
        let content_hit = memory(org, "unrelated title", "a database outage occurred", vec![]);
        index.index(&title_hit).await.unwrap();
        index.index(&content_hit).await.unwrap();

        let hits = index.search(org, "database outage", 10).await.unwrap();
        assert_eq!(hits[0].memory_id, title_hit.id);
    }

    #[tokio::test]
    async fn search_is_scoped_to_organization() {
        let index = InMemoryLexicalIndex::default();
        let org_a = new_id();
        let org_b = new_id();
        let doc = memory(org_a, "incident report", "body", vec![]);
        index.index(&doc).await.unwrap();

        let hits = index.search(org_b, "incident", 10).await.unwrap();
        assert!(hits.is_empty());
    }
}
