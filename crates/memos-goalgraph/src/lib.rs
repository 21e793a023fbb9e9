//! GoalGraph (C10, §4.6): goals, their node/edge decomposition, progress
//! rollup, blocker escalation, the meta-supervisor gate, and evidence-link
//! proposal flows.

pub mod blockers;
pub mod model;
pub mod proposal;
pub mod repo;
pub mod rollup;
pub mod service;
pub mod supervisor;

pub use blockers::{detect_blockers, escalate_if_blocked};
pub use model::{
    EdgeType, Goal, GoalActivityLog, GoalEdge, GoalMemoryLink, GoalNode, GoalStatus, GoalType,
    LinkType, LinkedBy, NodeStatus, NodeType, OwnerType, ProgressRollup,
};
pub use proposal::{propose_link, LlmGoalProposer, ProposalConfig, ProposalError, ProposedLink};
pub use repo::{
    GoalActivityLogRepo, GoalEdgeRepo, GoalMemoryLinkRepo, GoalNodeRepo, GoalRepo, GoalStoreError,
    InMemoryGoalActivityLogRepo, InMemoryGoalEdgeRepo, InMemoryGoalMemoryLinkRepo,
    InMemoryGoalNodeRepo, InMemoryGoalRepo,
};
pub use rollup::compute_rollup;
pub use service::{preview_blockers, GoalGraphService, GoalGraphServiceError};
pub use supervisor::{review_completion, review_evidence_link, SupervisorDecision};
