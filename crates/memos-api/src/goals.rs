//! `/api/v1/goals*` (§6, §4.6): proposal, node/edge decomposition,
//! evidence linking, status transitions, progress rollup, and the
//! blocker/activity views.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use memos_core::{GoalId, Scope};
use memos_goalgraph::{
    Goal, GoalActivityLog, GoalEdge, GoalMemoryLink, GoalNode, GoalStatus, GoalType, LinkType,
    LinkedBy, NodeStatus, NodeType, OwnerType, ProgressRollup,
};
use serde::Deserialize;
use serde_json::Value;

use crate::auth::AuthenticatedTenant;
use crate::error::ApiError;
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/api/v1/goals", post(create_goal))
        .route("/api/v1/goals/:id", get(get_goal))
        .route("/api/v1/goals/:id/nodes", post(upsert_node))
        .route("/api/v1/goals/:id/edges", post(upsert_edge))
        .route("/api/v1/goals/:id/links", post(link_memory))
        .route("/api/v1/goals/:id/transition", post(transition_status))
        .route("/api/v1/goals/:id/rollup", get(rollup))
        .route("/api/v1/goals/:id/blockers", post(check_blockers))
        .route("/api/v1/goals/:id/activity", get(activity_log))
}

#[derive(Debug, Deserialize)]
pub struct ProposeGoalRequest {
    pub owner_type: OwnerType,
    pub owner_id: uuid::Uuid,
    pub title: String,
    pub goal_type: GoalType,
    pub visibility_scope: Scope,
    #[serde(default)]
    pub scope_id: Option<uuid::Uuid>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    1.0
}

async fn create_goal(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Json(req): Json<ProposeGoalRequest>,
) -> Result<Json<Goal>, ApiError> {
    let user_id = ctx.actor.user_id().unwrap_or_default();
    let goal = Goal::propose(
        ctx.organization_id,
        user_id,
        req.owner_type,
        req.owner_id,
        req.title,
        req.goal_type,
        req.visibility_scope,
        req.scope_id,
        req.confidence,
    );
    let created = state.goals.create_goal(&ctx, goal).await?;
    Ok(Json(created))
}

async fn get_goal(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Path(id): Path<GoalId>,
) -> Result<Json<Goal>, ApiError> {
    match state.goals.get_goal(&ctx, id).await? {
        Some(goal) => Ok(Json(goal)),
        None => Err(ApiError::not_found("goal not found")),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpsertNodeRequest {
    pub id: Option<uuid::Uuid>,
    pub parent_node_id: Option<uuid::Uuid>,
    pub node_type: NodeType,
    pub title: String,
    #[serde(default)]
    pub status: Option<NodeStatus>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub assignees: Vec<uuid::Uuid>,
    #[serde(default)]
    pub ordering: i32,
    #[serde(default)]
    pub expected_outputs: Value,
    #[serde(default)]
    pub success_criteria: Value,
    #[serde(default)]
    pub blockers: Value,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

async fn upsert_node(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Path(goal_id): Path<GoalId>,
    Json(req): Json<UpsertNodeRequest>,
) -> Result<axum::http::StatusCode, ApiError> {
    let node = GoalNode {
        id: req.id.unwrap_or_else(memos_core::new_id),
        goal_id,
        parent_node_id: req.parent_node_id,
        node_type: req.node_type,
        title: req.title,
        status: req.status.unwrap_or(NodeStatus::Todo),
        priority: req.priority,
        assignees: req.assignees,
        ordering: req.ordering,
        expected_outputs: req.expected_outputs,
        success_criteria: req.success_criteria,
        blockers: req.blockers,
        confidence: req.confidence,
        completed_at: None,
    };
    state.goals.upsert_node(&ctx, node).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct UpsertEdgeRequest {
    pub from_node_id: uuid::Uuid,
    pub to_node_id: uuid::Uuid,
    pub edge_type: memos_goalgraph::EdgeType,
}

async fn upsert_edge(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Path(_goal_id): Path<GoalId>,
    Json(req): Json<UpsertEdgeRequest>,
) -> Result<axum::http::StatusCode, ApiError> {
    let edge = GoalEdge { from_node_id: req.from_node_id, to_node_id: req.to_node_id, edge_type: req.edge_type };
    state.goals.upsert_edge(&ctx, edge).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct LinkMemoryRequest {
    pub memory_id: uuid::Uuid,
    #[serde(default)]
    pub node_id: Option<uuid::Uuid>,
    pub link_type: LinkType,
    #[serde(default = "default_linked_by")]
    pub linked_by: LinkedBy,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    pub memory_scope: Scope,
}

fn default_linked_by() -> LinkedBy {
    LinkedBy::User
}

async fn link_memory(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Path(goal_id): Path<GoalId>,
    Json(req): Json<LinkMemoryRequest>,
) -> Result<axum::http::StatusCode, ApiError> {
    let goal = state
        .goals
        .get_goal(&ctx, goal_id)
        .await?
        .ok_or_else(|| ApiError::not_found("goal not found"))?;
    let link = GoalMemoryLink {
        organization_id: ctx.organization_id,
        goal_id,
        memory_id: req.memory_id,
        node_id: req.node_id,
        link_type: req.link_type,
        linked_by: req.linked_by,
        confidence: req.confidence,
    };
    state.goals.link_memory(&ctx, link, req.memory_scope, goal.visibility_scope).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct TransitionStatusRequest {
    pub status: GoalStatus,
}

async fn transition_status(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Path(goal_id): Path<GoalId>,
    Json(req): Json<TransitionStatusRequest>,
) -> Result<Json<Goal>, ApiError> {
    let goal = state
        .goals
        .get_goal(&ctx, goal_id)
        .await?
        .ok_or_else(|| ApiError::not_found("goal not found"))?;
    let updated = state.goals.transition_status(&ctx, goal, req.status).await?;
    Ok(Json(updated))
}

async fn rollup(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Path(goal_id): Path<GoalId>,
) -> Result<Json<ProgressRollup>, ApiError> {
    let rollup = state.goals.rollup(&ctx, goal_id).await?;
    Ok(Json(rollup))
}

async fn check_blockers(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Path(goal_id): Path<GoalId>,
) -> Result<Json<Goal>, ApiError> {
    let goal = state.goals.check_blockers(&ctx, goal_id).await?;
    Ok(Json(goal))
}

async fn activity_log(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Path(goal_id): Path<GoalId>,
) -> Result<Json<Vec<GoalActivityLog>>, ApiError> {
    let log = state.goals.activity_log(&ctx, goal_id).await?;
    Ok(Json(log))
}
