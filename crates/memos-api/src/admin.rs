//! `/api/v1/admin/*` maintenance triggers (§6, §4.5). These run the same
//! nightly-decay and causal-hypothesis-refresh jobs the background worker
//! pool runs on a schedule; exposing them lets an operator force a run.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use memos_core::MemoryId;
use memos_store::CausalHypothesis;
use memos_workers::{refresh_causal_hypotheses, run_nightly_decay, DecayReport};
use serde::Deserialize;

use crate::auth::AuthenticatedTenant;
use crate::error::ApiError;
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/api/v1/admin/nightly-decay-refresh", post(nightly_decay_refresh))
        .route("/api/v1/admin/causal-hypotheses/refresh", post(causal_hypotheses_refresh))
}

#[derive(Debug, Deserialize)]
pub struct NightlyDecayRefreshRequest {
    pub memory_ids: Vec<MemoryId>,
}

async fn nightly_decay_refresh(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Json(req): Json<NightlyDecayRefreshRequest>,
) -> Result<Json<DecayReport>, ApiError> {
    if !ctx.roles.iter().any(|r| r == "admin") {
        return Err(ApiError::unauthorized("admin role required"));
    }
    let report = run_nightly_decay(
        state.activation.as_ref(),
        state.coactivation.as_ref(),
        ctx.organization_id,
        &req.memory_ids,
        Utc::now(),
    )
    .await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct CausalHypothesesRefreshRequest {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

async fn causal_hypotheses_refresh(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Json(req): Json<CausalHypothesesRefreshRequest>,
) -> Result<Json<Vec<CausalHypothesis>>, ApiError> {
    if !ctx.roles.iter().any(|r| r == "admin") {
        return Err(ApiError::unauthorized("admin role required"));
    }
    let hypotheses =
        refresh_causal_hypotheses(state.coactivation.as_ref(), state.causal.as_ref(), ctx.organization_id, req.limit)
            .await?;
    Ok(Json(hypotheses))
}
