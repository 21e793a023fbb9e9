//! The run procedure (§4.3): hashing, idempotent short-circuit, cache
//! lookup, execute+validate, side-effect materialization, and trajectory
//! telemetry, wired together over the traits in `repo` and `effects`.

use crate::agent::AgentError;
use crate::effects::{EnrichmentKind, EnrichmentRecord, EnrichmentRepo, FeedbackLearningConfigRepo};
use crate::events::ToolEventSink;
use crate::model::{AgentName, AgentResult, AgentRun, AgentRunInputs, AgentRunStatus, AgentStrategy, CachedAgentOutput};
use crate::registry::AgentRegistry;
use crate::repo::{AgentResultCacheRepo, AgentRunRepo};
use chrono::{Duration, Utc};
use memos_audit::{AuditEvent, AuditSink, Severity};
use memos_core::TenantContext;
use memos_store::CoactivationRepo;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

/// Cache entries outlive a single run but are still refreshed regularly;
/// matches the `agents` config section's cache TTL knob (§9).
const CACHE_TTL_HOURS: i64 = 24;

pub struct RunRequest {
    pub agent_name: AgentName,
    pub strategy: AgentStrategy,
    pub model: Option<String>,
    pub attempt: u32,
    pub max_attempts: u32,
    pub inputs: AgentRunInputs,
}

pub struct AgentRunner<RR, CR, GR, ER, FR>
where
    RR: AgentRunRepo,
    CR: AgentResultCacheRepo,
    GR: CoactivationRepo,
    ER: EnrichmentRepo,
    FR: FeedbackLearningConfigRepo,
{
    run_repo: Arc<RR>,
    cache_repo: Arc<CR>,
    coactivation_repo: Arc<GR>,
    enrichment_repo: Arc<ER>,
    feedback_config_repo: Arc<FR>,
    events: Arc<dyn ToolEventSink>,
    audit: Arc<dyn AuditSink>,
    registry: AgentRegistry,
}

impl<RR, CR, GR, ER, FR> AgentRunner<RR, CR, GR, ER, FR>
where
    RR: AgentRunRepo,
    CR: AgentResultCacheRepo,
    GR: CoactivationRepo,
    ER: EnrichmentRepo,
    FR: FeedbackLearningConfigRepo,
{
    pub fn new(
        run_repo: Arc<RR>,
        cache_repo: Arc<CR>,
        coactivation_repo: Arc<GR>,
        enrichment_repo: Arc<ER>,
        feedback_config_repo: Arc<FR>,
        events: Arc<dyn ToolEventSink>,
        audit: Arc<dyn AuditSink>,
        registry: AgentRegistry,
    ) -> Self {
        Self {
            run_repo,
            cache_repo,
            coactivation_repo,
            enrichment_repo,
            feedback_config_repo,
            events,
            audit,
            registry,
        }
    }

    pub async fn run(&self, ctx: &TenantContext, request: RunRequest) -> AgentRun {
        let RunRequest {
            agent_name,
            strategy,
            model,
            attempt,
            max_attempts,
            inputs,
        } = request;

        let agent = match self.registry.get(agent_name) {
            Some(agent) => agent,
            None => return self.failed_run(agent_name, "v1", &inputs, "unknown agent".to_string(), ctx),
        };
        let started_at = Utc::now();

        let inputs_hash = memos_core::hashing::stable_hash_parts(&[
            json!(agent.name()),
            json!(agent.version()),
            json!(inputs.organization_id),
            json!(inputs.memory_id),
            json!(inputs.storage_tier),
            json!(inputs.content),
            json!(inputs.classification),
            json!(inputs.scope.as_str()),
            json!(inputs.scope_id),
            inputs.prior_enrichment.clone(),
            json!(inputs.feedback_fingerprint),
        ]);

        self.events.emit_call("agent_run_repo.get", json!({"agent": agent.name()}));
        let existing = self
            .run_repo
            .get(inputs.organization_id, inputs.memory_id, agent.name(), agent.version())
            .await
            .ok()
            .flatten();
        self.events.emit_result("agent_run_repo.get", true, 0, json!({}));

        if let Some(existing) = &existing {
            if existing.status == AgentRunStatus::Success && existing.inputs_hash == inputs_hash {
                return existing.clone();
            }
        }

        let cache_key = memos_core::hashing::stable_hash_parts(&[
            json!(agent.name()),
            json!(agent.version()),
            json!(format!("{strategy:?}")),
            json!(model),
            json!(inputs.organization_id),
            json!(inputs.storage_tier),
            json!(inputs.content),
            json!(inputs.classification),
            json!(inputs.scope.as_str()),
            json!(inputs.scope_id),
            inputs.prior_enrichment.clone(),
            json!(inputs.feedback_fingerprint),
        ]);

        let cached = if strategy == AgentStrategy::Llm {
            self.events.emit_call("result_cache.get", json!({"agent": agent.name()}));
            let cached = self.cache_repo.get(&cache_key).await.ok().flatten();
            self.events.emit_result("result_cache.get", true, 0, json!({"hit": cached.is_some()}));
            cached
        } else {
            None
        };

        let (result, from_cache) = if let Some(cached) = cached {
            (
                AgentResult {
                    status: AgentRunStatus::Success,
                    confidence: cached.confidence,
                    outputs: cached.outputs,
                    warnings: vec![],
                    errors: vec![],
                    provenance: json!({"source": "cache"}),
                },
                true,
            )
        } else {
            let clock = Instant::now();
            self.events.emit_call("agent.run", json!({"agent": agent.name()}));
            let run_outcome = agent.run(&inputs).await;
            self.events.emit_result(
                "agent.run",
                run_outcome.is_ok(),
                clock.elapsed().as_millis() as u64,
                json!({}),
            );

            match run_outcome {
                Ok(result) => {
                    if let Err(AgentError::Validation(reason)) = agent.validate_outputs(&result) {
                        return self.persist_terminal(
                            &inputs,
                            agent.name(),
                            agent.version(),
                            inputs_hash,
                            AgentRunStatus::Failed,
                            0.0,
                            Default::default(),
                            vec![],
                            vec![reason],
                            started_at,
                            ctx,
                        )
                        .await;
                    }
                    (result, false)
                }
                Err(AgentError::Validation(reason)) => {
                    return self
                        .persist_terminal(
                            &inputs,
                            agent.name(),
                            agent.version(),
                            inputs_hash,
                            AgentRunStatus::Failed,
                            0.0,
                            Default::default(),
                            vec![],
                            vec![reason],
                            started_at,
                            ctx,
                        )
                        .await;
                }
                Err(AgentError::Execution(reason)) => {
                    let status = if attempt < max_attempts {
                        AgentRunStatus::Retry
                    } else {
                        AgentRunStatus::Failed
                    };
                    return self
                        .persist_terminal(
                            &inputs,
                            agent.name(),
                            agent.version(),
                            inputs_hash,
                            status,
                            0.0,
                            Default::default(),
                            vec![],
                            vec![reason],
                            started_at,
                            ctx,
                        )
                        .await;
                }
            }
        };

        if result.status != AgentRunStatus::Skipped {
            self.materialize_side_effects(agent_name, &inputs, &result).await;
        }

        if strategy == AgentStrategy::Llm && !from_cache && result.status == AgentRunStatus::Success {
            let _ = self
                .cache_repo
                .set(
                    cache_key,
                    CachedAgentOutput {
                        outputs: result.outputs.clone(),
                        confidence: result.confidence,
                        expires_at: Utc::now() + Duration::hours(CACHE_TTL_HOURS),
                    },
                )
                .await;
        }

        let run = AgentRun {
            organization_id: inputs.organization_id,
            memory_id: inputs.memory_id,
            agent_name: agent.name().to_string(),
            agent_version: agent.version().to_string(),
            inputs_hash,
            status: result.status,
            confidence: result.confidence,
            outputs: result.outputs,
            warnings: result.warnings,
            errors: result.errors,
            started_at,
            finished_at: Some(Utc::now()),
            trace_id: ctx.trace_id,
            provenance: result.provenance,
        };

        self.events.emit_call("agent_run_repo.upsert", json!({"agent": run.agent_name}));
        let _ = self.run_repo.upsert(run.clone()).await;
        self.events.emit_result("agent_run_repo.upsert", true, 0, json!({}));
        self.events.emit_result(
            "run_result",
            true,
            0,
            json!({"status": format!("{:?}", run.status), "agent": run.agent_name}),
        );
        self.audit_run_result(ctx, &run).await;

        run
    }

    async fn audit_run_result(&self, ctx: &TenantContext, run: &AgentRun) {
        let severity = match run.status {
            AgentRunStatus::Success | AgentRunStatus::Skipped => Severity::Info,
            AgentRunStatus::Retry => Severity::Warn,
            AgentRunStatus::Failed => Severity::Error,
        };
        let _ = self
            .audit
            .record(
                AuditEvent::new(
                    ctx,
                    "agent_run.completed",
                    json!({"agent": run.agent_name, "status": format!("{:?}", run.status)}),
                )
                .with_severity(severity)
                .on_resource("memory", run.memory_id),
            )
            .await;
    }

    #[allow(clippy::too_many_arguments)]
    async fn persist_terminal(
        &self,
        inputs: &AgentRunInputs,
        name: &str,
        version: &str,
        inputs_hash: String,
        status: AgentRunStatus,
        confidence: f64,
        outputs: std::collections::HashMap<String, Value>,
        warnings: Vec<String>,
        errors: Vec<String>,
        started_at: chrono::DateTime<Utc>,
        ctx: &TenantContext,
    ) -> AgentRun {
        let run = AgentRun {
            organization_id: inputs.organization_id,
            memory_id: inputs.memory_id,
            agent_name: name.to_string(),
            agent_version: version.to_string(),
            inputs_hash,
            status,
            confidence,
            outputs,
            warnings,
            errors,
            started_at,
            finished_at: Some(Utc::now()),
            trace_id: ctx.trace_id,
            provenance: json!({}),
        };
        let _ = self.run_repo.upsert(run.clone()).await;
        self.events.emit_result(
            "run_result",
            true,
            0,
            json!({"status": format!("{:?}", run.status), "agent": run.agent_name}),
        );
        self.audit_run_result(ctx, &run).await;
        run
    }

    fn failed_run(
        &self,
        agent_name: AgentName,
        version: &str,
        inputs: &AgentRunInputs,
        reason: String,
        ctx: &TenantContext,
    ) -> AgentRun {
        AgentRun {
            organization_id: inputs.organization_id,
            memory_id: inputs.memory_id,
            agent_name: agent_name.as_str().to_string(),
            agent_version: version.to_string(),
            inputs_hash: String::new(),
            status: AgentRunStatus::Failed,
            confidence: 0.0,
            outputs: Default::default(),
            warnings: vec![],
            errors: vec![reason],
            started_at: Utc::now(),
            finished_at: Some(Utc::now()),
            trace_id: ctx.trace_id,
            provenance: json!({}),
        }
    }

    async fn materialize_side_effects(&self, agent_name: AgentName, inputs: &AgentRunInputs, result: &AgentResult) {
        self.events.emit_call("side_effects.materialize", json!({"agent": agent_name.as_str()}));
        match agent_name {
            AgentName::GraphLinking => {
                if let Some(ids) = result.outputs.get("related_memory_ids").and_then(|v| v.as_array()) {
                    for id in ids {
                        if let Some(other) = id.as_str().and_then(|s| uuid::Uuid::parse_str(s).ok()) {
                            let _ = self
                                .coactivation_repo
                                .upsert_pair(inputs.organization_id, inputs.memory_id, other, Utc::now())
                                .await;
                        }
                    }
                }
            }
            AgentName::Topic => {
                if let Some(topics) = result.outputs.get("topics").and_then(|v| v.as_array()).cloned() {
                    let _ = self
                        .enrichment_repo
                        .upsert(
                            EnrichmentKind::Topics,
                            EnrichmentRecord {
                                organization_id: inputs.organization_id,
                                memory_id: inputs.memory_id,
                                scope: inputs.scope,
                                scope_id: inputs.scope_id,
                                items: topics,
                            },
                        )
                        .await;
                }
            }
            AgentName::Pattern | AgentName::PatternDetection => {
                if let Some(patterns) = result.outputs.get("patterns").and_then(|v| v.as_array()).cloned() {
                    let _ = self
                        .enrichment_repo
                        .upsert(
                            EnrichmentKind::Patterns,
                            EnrichmentRecord {
                                organization_id: inputs.organization_id,
                                memory_id: inputs.memory_id,
                                scope: inputs.scope,
                                scope_id: inputs.scope_id,
                                items: patterns,
                            },
                        )
                        .await;
                }
            }
            AgentName::FeedbackLearning => {
                if let Some(diff) = result.outputs.get("config_diff") {
                    if diff.as_object().map(|m| !m.is_empty()).unwrap_or(false) {
                        let _ = self.feedback_config_repo.apply_diff(inputs.organization_id, diff).await;
                    }
                }
            }
            AgentName::LogseqExport => {
                if let Some(markdown) = result.outputs.get("export_markdown").cloned() {
                    let _ = self
                        .enrichment_repo
                        .upsert(
                            EnrichmentKind::LogseqExport,
                            EnrichmentRecord {
                                organization_id: inputs.organization_id,
                                memory_id: inputs.memory_id,
                                scope: inputs.scope,
                                scope_id: inputs.scope_id,
                                items: vec![markdown],
                            },
                        )
                        .await;
                }
            }
            AgentName::Classification | AgentName::Metadata => {}
        }
        self.events.emit_result("side_effects.materialize", true, 0, json!({}));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{InMemoryEnrichmentRepo, InMemoryFeedbackLearningConfigRepo};
    use crate::events::InMemoryToolEventSink;
    use crate::repo::{InMemoryAgentResultCacheRepo, InMemoryAgentRunRepo};
    use memos_audit::InMemoryAuditSink;
    use memos_core::{new_id, Scope};
    use memos_store::InMemoryCoactivationRepo;

    fn ctx() -> TenantContext {
        TenantContext::for_user(new_id(), new_id(), vec!["member".into()], 0)
    }

    fn inputs(org: uuid::Uuid, memory_id: uuid::Uuid, content: &str, fingerprint: &str) -> AgentRunInputs {
        AgentRunInputs {
            organization_id: org,
            memory_id,
            storage_tier: "long_term".into(),
            content: content.to_string(),
            classification: "general".into(),
            scope: Scope::Personal,
            scope_id: None,
            prior_enrichment: json!({}),
            feedback_fingerprint: fingerprint.to_string(),
        }
    }

    fn runner() -> AgentRunner<
        InMemoryAgentRunRepo,
        InMemoryAgentResultCacheRepo,
        InMemoryCoactivationRepo,
        InMemoryEnrichmentRepo,
        InMemoryFeedbackLearningConfigRepo,
    > {
        AgentRunner::new(
            Arc::new(InMemoryAgentRunRepo::default()),
            Arc::new(InMemoryAgentResultCacheRepo::default()),
            Arc::new(InMemoryCoactivationRepo::default()),
            Arc::new(InMemoryEnrichmentRepo::default()),
            Arc::new(InMemoryFeedbackLearningConfigRepo::default()),
            Arc::new(InMemoryToolEventSink::default()),
            Arc::new(InMemoryAuditSink::default()),
            AgentRegistry::default(),
        )
    }

    #[tokio::test]
    async fn idempotent_short_circuit_on_matching_inputs_hash() {
        let runner = runner();
        let ctx = ctx();
        let org = new_id();
        let memory_id = new_id();

        let first = runner
            .run(
                &ctx,
                RunRequest {
                    agent_name: AgentName::Metadata,
                    strategy: AgentStrategy::Deterministic,
                    model: None,
                    attempt: 0,
                    max_attempts: 3,
                    inputs: inputs(org, memory_id, "hello world", "0:"),
                },
            )
            .await;
        assert_eq!(first.status, AgentRunStatus::Success);

        let second = runner
            .run(
                &ctx,
                RunRequest {
                    agent_name: AgentName::Metadata,
                    strategy: AgentStrategy::Deterministic,
                    model: None,
                    attempt: 0,
                    max_attempts: 3,
                    inputs: inputs(org, memory_id, "hello world", "0:"),
                },
            )
            .await;
        assert_eq!(second.outputs, first.outputs);
    }

    #[tokio::test]
    async fn execution_error_retries_then_fails_after_max_attempts() {
        let runner = runner();
        let ctx = ctx();
        let org = new_id();
        let memory_id = new_id();

        let retrying = runner
            .run(
                &ctx,
                RunRequest {
                    agent_name: AgentName::Classification,
                    strategy: AgentStrategy::Deterministic,
                    model: None,
                    attempt: 0,
                    max_attempts: 2,
                    inputs: inputs(org, memory_id, "", "0:"),
                },
            )
            .await;
        assert_eq!(retrying.status, AgentRunStatus::Retry);

        let failed = runner
            .run(
                &ctx,
                RunRequest {
                    agent_name: AgentName::Classification,
                    strategy: AgentStrategy::Deterministic,
                    model: None,
                    attempt: 2,
                    max_attempts: 2,
                    inputs: inputs(org, memory_id, "", "0:"),
                },
            )
            .await;
        assert_eq!(failed.status, AgentRunStatus::Failed);
    }

    #[tokio::test]
    async fn llm_strategy_cache_hit_is_reused_across_memories_with_identical_content() {
        let runner = runner();
        let ctx = ctx();
        let org = new_id();

        let first = runner
            .run(
                &ctx,
                RunRequest {
                    agent_name: AgentName::Topic,
                    strategy: AgentStrategy::Llm,
                    model: None,
                    attempt: 0,
                    max_attempts: 3,
                    inputs: inputs(org, new_id(), "alpha beta gamma alpha beta", "0:"),
                },
            )
            .await;
        assert_eq!(first.provenance, json!({"method": "term_frequency"}));

        let second = runner
            .run(
                &ctx,
                RunRequest {
                    agent_name: AgentName::Topic,
                    strategy: AgentStrategy::Llm,
                    model: None,
                    attempt: 0,
                    max_attempts: 3,
                    inputs: inputs(org, new_id(), "alpha beta gamma alpha beta", "0:"),
                },
            )
            .await;

        assert_eq!(first.outputs, second.outputs);
        assert_eq!(second.provenance, json!({"source": "cache"}));
    }

    #[tokio::test]
    async fn deterministic_strategy_never_reuses_a_cache_hit() {
        let runner = runner();
        let ctx = ctx();
        let org = new_id();

        for _ in 0..2 {
            let run = runner
                .run(
                    &ctx,
                    RunRequest {
                        agent_name: AgentName::Topic,
                        strategy: AgentStrategy::Deterministic,
                        model: None,
                        attempt: 0,
                        max_attempts: 3,
                        inputs: inputs(org, new_id(), "alpha beta gamma alpha beta", "0:"),
                    },
                )
                .await;
            assert_eq!(run.provenance, json!({"method": "term_frequency"}));
        }
    }

    #[tokio::test]
    async fn graph_linking_side_effect_upserts_coactivation_edge() {
        let coactivation_repo = Arc::new(InMemoryCoactivationRepo::default());
        let runner = AgentRunner::new(
            Arc::new(InMemoryAgentRunRepo::default()),
            Arc::new(InMemoryAgentResultCacheRepo::default()),
            coactivation_repo.clone(),
            Arc::new(InMemoryEnrichmentRepo::default()),
            Arc::new(InMemoryFeedbackLearningConfigRepo::default()),
            Arc::new(InMemoryToolEventSink::default()),
            Arc::new(InMemoryAuditSink::default()),
            AgentRegistry::default(),
        );
        let ctx = ctx();
        let org = new_id();
        let memory_id = new_id();
        let other = new_id();

        let mut input = inputs(org, memory_id, "related item", "0:");
        input.prior_enrichment = json!({"related_memory_ids": [other.to_string()]});

        runner
            .run(
                &ctx,
                RunRequest {
                    agent_name: AgentName::GraphLinking,
                    strategy: AgentStrategy::Deterministic,
                    model: None,
                    attempt: 0,
                    max_attempts: 3,
                    inputs: input,
                },
            )
            .await;

        let neighbors = coactivation_repo.neighbors(org, memory_id).await.unwrap();
        assert_eq!(neighbors.len(), 1);
    }
}
