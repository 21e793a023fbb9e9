//! `/api/v1/pipelines*` (§6, §4.4): task enqueue and queue/DLQ
//! observability. Dequeue and terminal-state transitions are driven by the
//! worker pool, not exposed here.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use memos_scheduler::{DeadLetterEntry, PipelineTask, QueueStats};
use serde::Deserialize;
use serde_json::Value;

use crate::auth::AuthenticatedTenant;
use crate::error::ApiError;
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/api/v1/pipelines", post(enqueue))
        .route("/api/v1/pipelines/stats", get(stats))
        .route("/api/v1/pipelines/dead-letters", get(dead_letters))
}

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub task_type: String,
    #[serde(default)]
    pub priority: i32,
    pub sla_deadline: DateTime<Utc>,
    pub sla_category: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,
    #[serde(default)]
    pub metadata: Value,
}

fn default_max_attempts() -> i32 {
    3
}

async fn enqueue(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Json(req): Json<EnqueueRequest>,
) -> Result<Json<PipelineTask>, ApiError> {
    let task = PipelineTask::new(
        ctx.organization_id,
        req.task_type,
        req.priority,
        req.sla_deadline,
        req.sla_category,
        req.max_attempts,
        ctx.trace_id,
        req.metadata,
    );
    let result = task.clone();
    state.scheduler.enqueue(&ctx, task).await?;
    Ok(Json(result))
}

async fn stats(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
) -> Json<QueueStats> {
    Json(state.scheduler.stats(&ctx, Utc::now()).await)
}

async fn dead_letters(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
) -> Json<Vec<DeadLetterEntry>> {
    Json(state.scheduler.dead_letters(&ctx).await)
}
