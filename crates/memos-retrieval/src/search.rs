//! Hybrid search orchestration (§4.2 Search): vector + lexical legs, union,
//! permission filter, temporal decay, feedback rerank, activation scoring,
//! explanation logging, and async tail enqueue.

use crate::feedback::FeedbackRepo;
use crate::model::{
    ActivationComponents, FeedbackSignal, GatingInfo, ProvenanceRecord, RetrievalExplanation,
    RetrievalResultExplanation, RetrievedMemory, SearchRequest,
};
use crate::scoring::{score, ScoringInputs};
use chrono::{Duration, Utc};
use memos_audit::{AuditEvent, AuditSink};
use memos_core::config::ActivationWeights;
use memos_core::{MemoryId, TenantContext};
use memos_permission::{filter_memory_ids_with_access, Action, MemorySharing, TeamMembership};
use memos_scheduler::{PipelineTask, TaskQueue};
use memos_store::{ActivationRepo, CoactivationRepo, LexicalIndex, MemoryRepo, VectorIndex};
use std::collections::HashMap;
use std::sync::Arc;

pub struct SearchConfig {
    pub temporal_decay_enabled: bool,
    pub feedback_rerank_enabled: bool,
    pub feedback_positive_multiplier: f64,
    pub feedback_negative_multiplier: f64,
    pub feedback_window: Duration,
    pub activation_weights: ActivationWeights,
}

impl SearchConfig {
    pub fn from_search_section(section: &memos_core::config::SearchSection) -> Self {
        let pos = if section.feedback_positive_multiplier > 0.0 {
            section.feedback_positive_multiplier
        } else {
            1.15
        };
        let neg = if section.feedback_negative_multiplier > 0.0 {
            section.feedback_negative_multiplier
        } else {
            0.5
        };
        Self {
            temporal_decay_enabled: section.temporal_decay_enabled,
            feedback_rerank_enabled: section.feedback_rerank_enabled,
            feedback_positive_multiplier: pos,
            feedback_negative_multiplier: neg,
            feedback_window: Duration::days(30),
            activation_weights: section.activation.clone(),
        }
    }
}

pub struct SearchEngine<R, V, L, AR, CR, FR, Q> {
    repo: Arc<R>,
    vector_index: Arc<V>,
    lexical_index: Arc<L>,
    activation_repo: Arc<AR>,
    coactivation_repo: Arc<CR>,
    feedback_repo: Arc<FR>,
    explanation_sink: Arc<dyn crate::explanation::ExplanationSink>,
    audit: Arc<dyn AuditSink>,
    task_queue: Arc<Q>,
    config: SearchConfig,
}

impl<R, V, L, AR, CR, FR, Q> SearchEngine<R, V, L, AR, CR, FR, Q>
where
    R: MemoryRepo,
    V: VectorIndex,
    L: LexicalIndex,
    AR: ActivationRepo,
    CR: CoactivationRepo,
    FR: FeedbackRepo,
    Q: TaskQueue,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: Arc<R>,
        vector_index: Arc<V>,
        lexical_index: Arc<L>,
        activation_repo: Arc<AR>,
        coactivation_repo: Arc<CR>,
        feedback_repo: Arc<FR>,
        explanation_sink: Arc<dyn crate::explanation::ExplanationSink>,
        audit: Arc<dyn AuditSink>,
        task_queue: Arc<Q>,
        config: SearchConfig,
    ) -> Self {
        Self {
            repo,
            vector_index,
            lexical_index,
            activation_repo,
            coactivation_repo,
            feedback_repo,
            explanation_sink,
            audit,
            task_queue,
            config,
        }
    }

    /// Permission is enforced per-candidate via `filter_memory_ids_with_access`;
    /// the caller is responsible for authorizing the endpoint itself (§4.2:
    /// "C3 has already authorized the endpoint" before C6 runs).
    pub async fn search(
        &self,
        ctx: &TenantContext,
        request: SearchRequest,
        team_memberships: &[TeamMembership],
        sharing: &[MemorySharing],
    ) -> Vec<RetrievedMemory> {
        let now = Utc::now();
        let over_fetch = request.top_k.saturating_mul(2).max(1);

        let vector_hits = if let Some(embedding) = &request.query_embedding {
            self.vector_index
                .search(ctx.organization_id, embedding, over_fetch)
                .await
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        let lexical_hits = if request.hybrid {
            self.lexical_index
                .search(ctx.organization_id, &request.query, over_fetch)
                .await
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        let vector_max = vector_hits.iter().map(|h| h.score).fold(0.0f64, f64::max);
        let lexical_max = lexical_hits.iter().map(|h| h.score).fold(0.0f64, f64::max);

        let mut hybrid_raw: HashMap<MemoryId, f64> = HashMap::new();
        for hit in &vector_hits {
            let vec_norm = if vector_max > 0.0 { hit.score / vector_max } else { 0.0 };
            let weight = if request.hybrid { 0.7 } else { 1.0 };
            *hybrid_raw.entry(hit.memory_id).or_insert(0.0) += weight * vec_norm;
        }
        if request.hybrid {
            for hit in &lexical_hits {
                let lex_norm = if lexical_max > 0.0 { hit.score / lexical_max } else { 0.0 };
                *hybrid_raw.entry(hit.memory_id).or_insert(0.0) += 0.3 * lex_norm;
            }
        }

        let candidate_ids: Vec<MemoryId> = hybrid_raw.keys().copied().collect();
        let memories = self
            .repo
            .get_many(ctx.organization_id, &candidate_ids)
            .await
            .unwrap_or_default();

        let allowed_ids = filter_memory_ids_with_access(
            ctx,
            &memories,
            Action::Read,
            team_memberships,
            sharing,
            now,
        );
        let mut allowed_ids: std::collections::HashSet<_> = allowed_ids.into_iter().collect();
        if let Some(scope) = request.scope {
            allowed_ids.retain(|id| {
                memories
                    .iter()
                    .find(|m| m.id == *id)
                    .map(|m| m.scope == scope)
                    .unwrap_or(false)
            });
        }

        let memory_by_id: HashMap<MemoryId, &memos_store::Memory> =
            memories.iter().map(|m| (m.id, m)).collect();

        let half_life = request.mode.half_life_days();

        let mut scored: Vec<(MemoryId, f64)> = Vec::new();
        for (memory_id, raw) in &hybrid_raw {
            if !allowed_ids.contains(memory_id) {
                continue;
            }
            let Some(memory) = memory_by_id.get(memory_id) else {
                continue;
            };
            let mut adjusted = *raw;

            if self.config.temporal_decay_enabled {
                let reference = memory
                    .last_accessed_at
                    .or(Some(memory.updated_at))
                    .unwrap_or(memory.created_at);
                let age_days = (now - reference).num_milliseconds() as f64 / 86_400_000.0;
                adjusted *= 0.5f64.powf(age_days.max(0.0) / half_life);
            }

            if self.config.feedback_rerank_enabled {
                if let Some(signal) = self
                    .feedback_repo
                    .most_recent(
                        ctx.actor.user_id().unwrap_or_default(),
                        *memory_id,
                        now,
                        self.config.feedback_window,
                    )
                    .await
                {
                    adjusted *= match signal {
                        FeedbackSignal::Positive => self.config.feedback_positive_multiplier,
                        FeedbackSignal::Negative => self.config.feedback_negative_multiplier,
                    };
                }
            }

            scored.push((*memory_id, adjusted));
        }

        let candidate_ids_for_nbr: Vec<MemoryId> = scored.iter().map(|(id, _)| *id).collect();

        let mut results: Vec<(MemoryId, f64, ActivationComponents, f64)> = Vec::new();
        for (memory_id, hybrid_raw_adjusted) in &scored {
            let activation_state = self
                .activation_repo
                .get_or_default(*memory_id)
                .await
                .unwrap_or_else(|_| memos_store::ActivationState::default_for(*memory_id));

            let neighbor_boost = self
                .coactivation_repo
                .max_weight_to(ctx.organization_id, *memory_id, &candidate_ids_for_nbr)
                .await
                .unwrap_or(None);

            let (components, activation) = score(
                &self.config.activation_weights,
                &ScoringInputs {
                    hybrid_raw: *hybrid_raw_adjusted,
                    activation_state: &activation_state,
                    context: &request.context,
                    neighbor_boost,
                    now,
                },
            );
            results.push((*memory_id, activation, components, *hybrid_raw_adjusted));
        }

        results.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.3.partial_cmp(&a.3).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| {
                    let created_a = memory_by_id.get(&a.0).map(|m| m.created_at);
                    let created_b = memory_by_id.get(&b.0).map(|m| m.created_at);
                    created_b.cmp(&created_a)
                })
        });
        results.truncate(request.top_k);

        let mut explanation_results = Vec::with_capacity(results.len());
        let mut retrieved = Vec::with_capacity(results.len());
        for (rank, (memory_id, activation, components, hybrid_raw_adjusted)) in
            results.iter().enumerate()
        {
            explanation_results.push(RetrievalResultExplanation {
                memory_id: *memory_id,
                activation: *activation,
                components: *components,
                gating: GatingInfo {
                    allowed: true,
                    reason: "read access granted".to_string(),
                },
                rank,
            });

            if let Some(memory) = memory_by_id.get(memory_id) {
                let provenance = ProvenanceRecord {
                    kind: "memory".to_string(),
                    source_type: memory.source_type.clone(),
                    source_id: memory.id,
                    source_version: memory.updated_at.to_rfc3339(),
                    content_hash: memory.content_hash.clone(),
                    title: memory.title.clone(),
                    excerpt: memory.content_preview.clone(),
                    score: *activation,
                    meta: serde_json::json!({}),
                };
                retrieved.push(RetrievedMemory {
                    memory: (*memory).clone(),
                    activation: *activation,
                    hybrid_raw: *hybrid_raw_adjusted,
                    components: *components,
                    provenance,
                });
            }
        }

        let explanation = RetrievalExplanation {
            id: memos_core::new_id(),
            organization_id: ctx.organization_id,
            query_hash: memos_core::hashing::sha256_hex(&request.query),
            user_id: ctx.actor.user_id().unwrap_or_default(),
            retrieved_at: now,
            top_k: request.top_k,
            results: explanation_results,
        };
        self.explanation_sink.record(explanation).await.ok();

        self.audit
            .record(AuditEvent::new(
                ctx,
                "retrieval.search",
                serde_json::json!({ "result_count": retrieved.len() }),
            ))
            .await
            .ok();

        self.enqueue_async_tails(ctx, &retrieved).await;

        retrieved
    }

    /// Fire-and-forget enqueue of `access_update`/`coactivation_update`
    /// tasks (§4.2 Async tails). A disabled/unavailable queue must never
    /// fail the request.
    async fn enqueue_async_tails(&self, ctx: &TenantContext, retrieved: &[RetrievedMemory]) {
        for memory in retrieved {
            let task = PipelineTask::new(
                ctx.organization_id,
                "access_update",
                0,
                Utc::now() + Duration::minutes(5),
                "background",
                3,
                ctx.trace_id,
                serde_json::json!({ "memory_id": memory.memory.id }),
            );
            let _ = self.task_queue.enqueue(task).await;
        }

        if retrieved.len() >= 2 {
            let primary = retrieved[0].memory.id;
            let co_ids: Vec<MemoryId> = retrieved[1..].iter().map(|m| m.memory.id).collect();
            let task = PipelineTask::new(
                ctx.organization_id,
                "coactivation_update",
                0,
                Utc::now() + Duration::minutes(5),
                "background",
                3,
                ctx.trace_id,
                serde_json::json!({ "primary": primary, "co": co_ids }),
            );
            let _ = self.task_queue.enqueue(task).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explanation::{ExplanationSink, InMemoryExplanationSink};
    use crate::feedback::InMemoryFeedbackRepo;
    use crate::model::{ContextAffinities, SearchMode};
    use memos_audit::InMemoryAuditSink;
    use memos_core::{new_id, OrganizationId, Scope};
    use memos_scheduler::InMemoryTaskQueue;
    use memos_store::{
        Classification, InMemoryActivationRepo, InMemoryCoactivationRepo, InMemoryLexicalIndex,
        InMemoryMemoryRepo, InMemoryVectorIndex, Memory, MemoryRepo, MemoryType, VectorIndex,
        VectorPayload,
    };
    use std::collections::HashMap as Map;

    fn memory(org: OrganizationId, title: &str, vector_id: &str) -> Memory {
        let now = Utc::now();
        Memory {
            id: new_id(),
            organization_id: org,
            owner_user_id: new_id(),
            scope: Scope::Global,
            scope_id: None,
            memory_type: MemoryType::LongTerm,
            classification: Classification::Internal,
            required_clearance: 0,
            title: title.to_string(),
            content_preview: "body".to_string(),
            content_hash: "hash".into(),
            tags: vec![],
            entities: Map::new(),
            metadata: serde_json::json!({}),
            source_type: "manual".into(),
            vector_id: Some(vector_id.to_string()),
            embedding_model: None,
            is_active: true,
            legal_hold: false,
            created_at: now,
            updated_at: now,
            access_count: 0,
            last_accessed_at: None,
        }
    }

    #[tokio::test]
    async fn search_returns_ranked_results_with_explanation() {
        let repo = Arc::new(InMemoryMemoryRepo::default());
        let vector_index = Arc::new(InMemoryVectorIndex::default());
        let lexical_index = Arc::new(InMemoryLexicalIndex::default());
        let activation_repo = Arc::new(InMemoryActivationRepo::default());
        let coactivation_repo = Arc::new(InMemoryCoactivationRepo::default());
        let feedback_repo = Arc::new(InMemoryFeedbackRepo::default());
        let explanation_sink = Arc::new(InMemoryExplanationSink::default());
        let audit = Arc::new(InMemoryAuditSink::default());
        let task_queue = Arc::new(InMemoryTaskQueue::default());

        let org = new_id();
        let relevant = memory(org, "incident report database outage", "v1");
        let other = memory(org, "unrelated note", "v2");
        repo.insert(relevant.clone()).await.unwrap();
        repo.insert(other.clone()).await.unwrap();

        vector_index
            .upsert(
                VectorPayload {
                    memory_id: relevant.id,
                    organization_id: org,
                    owner_id: relevant.owner_user_id,
                    scope: relevant.scope,
                    scope_id: None,
                    team_id: None,
                    tags: vec![],
                    classification: relevant.classification,
                    memory_type: relevant.memory_type,
                    created_at: relevant.created_at,
                },
                vec![1.0, 0.0],
            )
            .await
            .unwrap();

        lexical_index.index(&relevant).await.unwrap();
        lexical_index.index(&other).await.unwrap();

        let engine = SearchEngine::new(
            repo,
            vector_index,
            lexical_index,
            activation_repo,
            coactivation_repo,
            feedback_repo,
            explanation_sink.clone(),
            audit,
            task_queue,
            SearchConfig::from_search_section(&memos_core::config::SearchSection {
                default_mode: "balanced".into(),
                temporal_decay_enabled: false,
                feedback_rerank_enabled: true,
                feedback_positive_multiplier: 1.15,
                feedback_negative_multiplier: 0.5,
                activation: Default::default(),
            }),
        );

        let ctx = TenantContext::for_user(new_id(), org, vec![], 0);
        let request = SearchRequest {
            query: "database outage".to_string(),
            query_embedding: Some(vec![1.0, 0.0]),
            top_k: 5,
            hybrid: true,
            mode: SearchMode::Balanced,
            scope: None,
            context: ContextAffinities::default(),
        };

        let results = engine.search(&ctx, request, &[], &[]).await;

        assert!(!results.is_empty());
        assert_eq!(results[0].memory.id, relevant.id);

        let explanations = explanation_sink.list_recent(org, 10).await.unwrap();
        assert_eq!(explanations.len(), 1);
        assert_eq!(explanations[0].results.len(), results.len());
    }
}
