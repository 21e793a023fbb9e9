//! `/api/v1/coactivation/neighbors/{memory_id}[/details]` (§6, §3).

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use memos_core::MemoryId;
use memos_store::CoactivationEdge;

use crate::auth::AuthenticatedTenant;
use crate::error::ApiError;
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/api/v1/coactivation/neighbors/:memory_id", get(neighbors))
        .route("/api/v1/coactivation/neighbors/:memory_id/details", get(neighbor_details))
}

async fn neighbors(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Path(memory_id): Path<MemoryId>,
) -> Result<Json<Vec<MemoryId>>, ApiError> {
    let edges = state.coactivation.neighbors(ctx.organization_id, memory_id).await?;
    let ids = edges
        .into_iter()
        .map(|edge| if edge.a == memory_id { edge.b } else { edge.a })
        .collect();
    Ok(Json(ids))
}

async fn neighbor_details(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Path(memory_id): Path<MemoryId>,
) -> Result<Json<Vec<CoactivationEdge>>, ApiError> {
    let edges = state.coactivation.neighbors(ctx.organization_id, memory_id).await?;
    Ok(Json(edges))
}
