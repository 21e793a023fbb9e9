//! `/api/v1/memories*` (§6): create, fetch, patch, soft-delete, hybrid
//! search, and relevance feedback.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use memos_core::{MemoryId, Scope, UserId};
use memos_retrieval::{ContextAffinities, FeedbackSignal, RelevanceFeedback, SearchMode, SearchRequest};
use memos_store::{Classification, CreateMemoryInput, Memory, MemoryType};
use serde::Deserialize;

use crate::auth::AuthenticatedTenant;
use crate::error::ApiError;
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/api/v1/memories", post(create_memory))
        .route("/api/v1/memories/:id", get(get_memory).patch(update_memory).delete(delete_memory))
        .route("/api/v1/memories/search", post(search_memories))
        .route("/api/v1/memories/:id/relevance", post(record_relevance))
}

#[derive(Debug, Deserialize)]
pub struct CreateMemoryRequest {
    pub owner_user_id: UserId,
    pub scope: Scope,
    pub scope_id: Option<uuid::Uuid>,
    pub memory_type: MemoryType,
    pub classification: Classification,
    pub required_clearance: i32,
    pub title: String,
    pub content_preview: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub entities: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub source_type: String,
    #[serde(default)]
    pub vector_id: Option<String>,
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl From<CreateMemoryRequest> for CreateMemoryInput {
    fn from(req: CreateMemoryRequest) -> Self {
        CreateMemoryInput {
            owner_user_id: req.owner_user_id,
            scope: req.scope,
            scope_id: req.scope_id,
            memory_type: req.memory_type,
            classification: req.classification,
            required_clearance: req.required_clearance,
            title: req.title,
            content_preview: req.content_preview,
            tags: req.tags,
            entities: req.entities,
            metadata: req.metadata,
            source_type: req.source_type,
            vector_id: req.vector_id,
            embedding_model: req.embedding_model,
            embedding: req.embedding,
        }
    }
}

async fn create_memory(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Json(req): Json<CreateMemoryRequest>,
) -> Result<Json<Memory>, ApiError> {
    let memory = state.memories.create(&ctx, req.into()).await?;
    Ok(Json(memory))
}

async fn get_memory(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Path(id): Path<MemoryId>,
) -> Result<Json<Memory>, ApiError> {
    // No team/sharing administration surface is wired into the HTTP layer
    // yet, so every read is evaluated against an empty grant set; owner and
    // organization/global-scope reads still work via `check_memory_access`.
    match state.memories.get(&ctx, id, &[], &[]).await? {
        Some(memory) => Ok(Json(memory)),
        None => Err(ApiError::not_found("memory not found")),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemoryRequest {
    pub title: Option<String>,
    pub content_preview: Option<String>,
    pub tags: Option<Vec<String>>,
    pub classification: Option<Classification>,
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

async fn update_memory(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Path(id): Path<MemoryId>,
    Json(req): Json<UpdateMemoryRequest>,
) -> Result<Json<Memory>, ApiError> {
    let embedding = req.embedding.clone();
    let memory = state
        .memories
        .update(
            &ctx,
            id,
            move |memory| {
                if let Some(title) = req.title {
                    memory.title = title;
                }
                if let Some(content_preview) = req.content_preview {
                    memory.content_preview = content_preview;
                }
                if let Some(tags) = req.tags {
                    memory.tags = tags;
                }
                if let Some(classification) = req.classification {
                    memory.classification = classification;
                }
                if let Some(metadata) = req.metadata {
                    memory.metadata = metadata;
                }
            },
            &[],
            &[],
            embedding,
        )
        .await?;
    Ok(Json(memory))
}

async fn delete_memory(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Path(id): Path<MemoryId>,
) -> Result<axum::http::StatusCode, ApiError> {
    state.memories.soft_delete(&ctx, id, &[], &[]).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SearchMemoriesRequest {
    pub query: String,
    #[serde(default)]
    pub query_embedding: Option<Vec<f32>>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub hybrid: bool,
    #[serde(default)]
    pub mode: SearchModeDto,
    #[serde(default)]
    pub scope: Option<Scope>,
}

fn default_top_k() -> usize {
    10
}

#[derive(Debug, Default, Deserialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum SearchModeDto {
    #[default]
    Balanced,
    Performance,
    Research,
}

impl From<SearchModeDto> for SearchMode {
    fn from(mode: SearchModeDto) -> Self {
        match mode {
            SearchModeDto::Balanced => SearchMode::Balanced,
            SearchModeDto::Performance => SearchMode::Performance,
            SearchModeDto::Research => SearchMode::Research,
        }
    }
}

async fn search_memories(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Json(req): Json<SearchMemoriesRequest>,
) -> Result<Json<Vec<memos_retrieval::RetrievedMemory>>, ApiError> {
    let request = SearchRequest {
        query: req.query,
        query_embedding: req.query_embedding,
        top_k: req.top_k,
        hybrid: req.hybrid,
        mode: req.mode.into(),
        scope: req.scope,
        context: ContextAffinities::default(),
    };
    let results = state.search.search(&ctx, request, &[], &[]).await;
    Ok(Json(results))
}

#[derive(Debug, Deserialize)]
pub struct RelevanceFeedbackRequest {
    pub signal: RelevanceFeedbackSignal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceFeedbackSignal {
    Positive,
    Negative,
}

async fn record_relevance(
    State(state): State<ApiState>,
    AuthenticatedTenant(ctx): AuthenticatedTenant,
    Path(id): Path<MemoryId>,
    Json(req): Json<RelevanceFeedbackRequest>,
) -> Result<axum::http::StatusCode, ApiError> {
    let user_id = ctx.actor.user_id().unwrap_or_default();
    let signal = match req.signal {
        RelevanceFeedbackSignal::Positive => FeedbackSignal::Positive,
        RelevanceFeedbackSignal::Negative => FeedbackSignal::Negative,
    };
    state
        .feedback
        .record(RelevanceFeedback { memory_id: id, user_id, signal, recorded_at: Utc::now() })
        .await;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
