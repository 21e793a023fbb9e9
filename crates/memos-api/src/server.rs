//! Router assembly. Mirrors the `UiApiState`/`UiApiServer` split: state
//! construction is separate from route wiring so tests can build a router
//! over a hand-seeded state without going through `memos-server`'s config
//! loading.

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;

use crate::state::ApiState;
use crate::{admin, coactivation, explanations, goals, memories, pipelines};

#[derive(Clone)]
pub struct ApiServer {
    state: ApiState,
}

impl ApiServer {
    pub fn new(state: ApiState) -> Self {
        Self { state }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/healthz", get(health))
            .route("/readyz", get(health))
            .merge(memories::router())
            .merge(goals::router())
            .merge(pipelines::router())
            .merge(coactivation::router())
            .merge(explanations::router())
            .merge(admin::router())
            .with_state(self.state.clone())
    }

    pub fn state(&self) -> ApiState {
        self.state.clone()
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "timestamp": Utc::now().to_rfc3339() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Claims;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use memos_core::new_id;
    use memos_goalgraph::{InMemoryGoalActivityLogRepo, InMemoryGoalEdgeRepo, InMemoryGoalMemoryLinkRepo, InMemoryGoalNodeRepo, InMemoryGoalRepo};
    use memos_permission::{InMemoryRoleProvider, PermissionKernel};
    use memos_retrieval::{InMemoryExplanationSink, InMemoryFeedbackRepo, SearchConfig, SearchEngine};
    use memos_scheduler::{InMemoryTaskQueue, SchedulerService};
    use memos_store::{
        InMemoryActivationRepo, InMemoryCausalHypothesisRepo, InMemoryCoactivationRepo,
        InMemoryLexicalIndex, InMemoryMemoryRepo, InMemoryVectorIndex, MemoryStore,
    };
    use memos_audit::InMemoryAuditSink;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    const JWT_SECRET: &str = "test-secret";

    fn test_state(user_id: uuid::Uuid, org: uuid::Uuid) -> ApiState {
        let role_provider = InMemoryRoleProvider::grant_all(org, user_id, new_id());
        let permissions = Arc::new(PermissionKernel::new(role_provider, Duration::from_secs(5)));
        let audit = Arc::new(InMemoryAuditSink::default());

        let memories = Arc::new(MemoryStore::new(
            Arc::new(InMemoryMemoryRepo::default()),
            Arc::new(InMemoryActivationRepo::default()),
            Arc::new(InMemoryVectorIndex::default()),
            audit.clone(),
            permissions.clone(),
        ));

        let coactivation = Arc::new(InMemoryCoactivationRepo::default());
        let causal = Arc::new(InMemoryCausalHypothesisRepo::default());
        let activation = Arc::new(InMemoryActivationRepo::default());
        let feedback: Arc<dyn memos_retrieval::FeedbackRepo> = Arc::new(InMemoryFeedbackRepo::default());
        let explanations: Arc<dyn memos_retrieval::ExplanationSink> = Arc::new(InMemoryExplanationSink::default());
        let task_queue = Arc::new(InMemoryTaskQueue::default());

        let search = Arc::new(SearchEngine::new(
            Arc::new(InMemoryMemoryRepo::default()),
            Arc::new(InMemoryVectorIndex::default()),
            Arc::new(InMemoryLexicalIndex::default()),
            activation.clone(),
            coactivation.clone(),
            Arc::new(InMemoryFeedbackRepo::default()),
            explanations.clone(),
            audit.clone(),
            task_queue.clone(),
            SearchConfig {
                temporal_decay_enabled: false,
                feedback_rerank_enabled: false,
                feedback_positive_multiplier: 1.15,
                feedback_negative_multiplier: 0.5,
                feedback_window: chrono::Duration::days(30),
                activation_weights: Default::default(),
            },
        ));

        let scheduler = Arc::new(SchedulerService::new(task_queue, permissions.clone()));

        let goals = Arc::new(memos_goalgraph::GoalGraphService::new(
            Arc::new(InMemoryGoalRepo::default()),
            Arc::new(InMemoryGoalNodeRepo::default()),
            Arc::new(InMemoryGoalEdgeRepo::default()),
            Arc::new(InMemoryGoalMemoryLinkRepo::default()),
            Arc::new(InMemoryGoalActivityLogRepo::default()),
            permissions,
            audit,
        ));

        ApiState::new(memories, search, scheduler, goals, coactivation, causal, activation, explanations, feedback, JWT_SECRET)
    }

    fn bearer_token(user_id: uuid::Uuid, org: uuid::Uuid) -> String {
        let claims = Claims { sub: user_id, org, roles: vec!["admin".to_string()], clearance: 100, exp: 9_999_999_999 };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes())).unwrap()
    }

    #[tokio::test]
    async fn healthz_is_reachable_without_auth() {
        let server = ApiServer::new(test_state(new_id(), new_id()));
        let response = server
            .router()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn memory_endpoints_require_a_bearer_token() {
        let server = ApiServer::new(test_state(new_id(), new_id()));
        let response = server
            .router()
            .oneshot(Request::builder().uri("/api/v1/memories/search").method("POST").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_then_search_sees_the_new_memory() {
        let user_id = new_id();
        let org = new_id();
        let server = ApiServer::new(test_state(user_id, org));
        let token = bearer_token(user_id, org);

        let create_body = json!({
            "owner_user_id": new_id(),
            "scope": "organization",
            "memory_type": "short_term",
            "classification": "internal",
            "required_clearance": 0,
            "title": "a note",
            "content_preview": "remember this",
            "source_type": "manual",
        });

        let create_response = server
            .router()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/memories")
                    .method("POST")
                    .header("content-type", "application/json")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::from(create_body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(create_response.status(), StatusCode::OK);
        let bytes = to_bytes(create_response.into_body(), usize::MAX).await.unwrap();
        let created: memos_store::Memory = serde_json::from_slice(&bytes).unwrap();

        let fetch_response = server
            .router()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/memories/{}", created.id))
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(fetch_response.status(), StatusCode::OK);
    }
}
