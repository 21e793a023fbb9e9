//! Concrete service wiring behind the HTTP surface. Every service is
//! generic over its repo/checker types; the API binary only ever needs one
//! concrete instantiation, so this module monomorphizes each service over
//! the crate's `InMemory*` implementations the way `memos-server`'s
//! production build would over Postgres-backed ones.

use std::sync::Arc;

use memos_goalgraph::{
    GoalGraphService, InMemoryGoalActivityLogRepo, InMemoryGoalEdgeRepo,
    InMemoryGoalMemoryLinkRepo, InMemoryGoalNodeRepo, InMemoryGoalRepo,
};
use memos_permission::{InMemoryRoleProvider, PermissionKernel};
use memos_retrieval::{ExplanationSink, FeedbackRepo, InMemoryFeedbackRepo, SearchEngine};
use memos_scheduler::{InMemoryTaskQueue, SchedulerService};
use memos_store::{
    InMemoryActivationRepo, InMemoryCausalHypothesisRepo, InMemoryCoactivationRepo,
    InMemoryLexicalIndex, InMemoryMemoryRepo, InMemoryVectorIndex, MemoryStore,
};

type Checker = PermissionKernel<InMemoryRoleProvider>;

pub type ApiMemoryStore =
    MemoryStore<InMemoryMemoryRepo, InMemoryActivationRepo, InMemoryVectorIndex, Checker>;
pub type ApiSearchEngine = SearchEngine<
    InMemoryMemoryRepo,
    InMemoryVectorIndex,
    InMemoryLexicalIndex,
    InMemoryActivationRepo,
    InMemoryCoactivationRepo,
    InMemoryFeedbackRepo,
    InMemoryTaskQueue,
>;
pub type ApiSchedulerService = SchedulerService<InMemoryTaskQueue, Checker>;
pub type ApiGoalGraphService = GoalGraphService<
    InMemoryGoalRepo,
    InMemoryGoalNodeRepo,
    InMemoryGoalEdgeRepo,
    InMemoryGoalMemoryLinkRepo,
    InMemoryGoalActivityLogRepo,
    Checker,
>;

/// Shared, cloneable handle axum threads through every extractor. Each
/// field is already `Arc`-wrapped by its owning service, so cloning the
/// state is cheap (§5: handlers never hold a lock across a suspension
/// point; nothing here is locked at all).
#[derive(Clone)]
pub struct ApiState {
    pub memories: Arc<ApiMemoryStore>,
    pub search: Arc<ApiSearchEngine>,
    pub scheduler: Arc<ApiSchedulerService>,
    pub goals: Arc<ApiGoalGraphService>,
    pub coactivation: Arc<InMemoryCoactivationRepo>,
    pub causal: Arc<InMemoryCausalHypothesisRepo>,
    pub activation: Arc<InMemoryActivationRepo>,
    pub explanations: Arc<dyn ExplanationSink>,
    pub feedback: Arc<dyn FeedbackRepo>,
    pub jwt_secret: Arc<String>,
}

impl ApiState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        memories: Arc<ApiMemoryStore>,
        search: Arc<ApiSearchEngine>,
        scheduler: Arc<ApiSchedulerService>,
        goals: Arc<ApiGoalGraphService>,
        coactivation: Arc<InMemoryCoactivationRepo>,
        causal: Arc<InMemoryCausalHypothesisRepo>,
        activation: Arc<InMemoryActivationRepo>,
        explanations: Arc<dyn ExplanationSink>,
        feedback: Arc<dyn FeedbackRepo>,
        jwt_secret: impl Into<String>,
    ) -> Self {
        Self {
            memories,
            search,
            scheduler,
            goals,
            coactivation,
            causal,
            activation,
            explanations,
            feedback,
            jwt_secret: Arc::new(jwt_secret.into()),
        }
    }
}
