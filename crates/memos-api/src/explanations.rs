//! `/api/v1/memory-activation/retrieval-explanations` (§6, §3): list recent
//! explanations or fetch one by id.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use memos_retrieval::RetrievalExplanation;
use serde::Deserialize;

use crate::auth::AuthenticatedTenant;
use crate::error::ApiError;
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/api/v1/memory-activation/retrieval-explanations", get(list_recent))
        .route("/api/v1/memory-activation/retrieval-explanations/:id", get(get_by_id))
}

#[derive(Debug, Deserialize)]
pub struct ListExplanationsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

async fn list_recent(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Query(query): Query<ListExplanationsQuery>,
) -> Result<Json<Vec<RetrievalExplanation>>, ApiError> {
    let explanations = state.explanations.list_recent(ctx.organization_id, query.limit).await?;
    Ok(Json(explanations))
}

async fn get_by_id(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Path(id): Path<uuid::Uuid>,
) -> Result<Json<RetrievalExplanation>, ApiError> {
    match state.explanations.get(ctx.organization_id, id).await? {
        Some(explanation) => Ok(Json(explanation)),
        None => Err(ApiError::not_found("retrieval explanation not found")),
    }
}
