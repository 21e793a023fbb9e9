pub mod agent;
pub mod effects;
pub mod events;
pub mod model;
pub mod registry;
pub mod repo;
pub mod runner;

pub use agent::{Agent, AgentError};
pub use effects::{
    EffectsError, EnrichmentKind, EnrichmentRecord, EnrichmentRepo, FeedbackLearningConfig,
    FeedbackLearningConfigRepo, InMemoryEnrichmentRepo, InMemoryFeedbackLearningConfigRepo,
};
pub use events::{InMemoryToolEventSink, ToolCallEvent, ToolEventSink};
pub use model::{
    AgentName, AgentResult, AgentRun, AgentRunEvent, AgentRunInputs, AgentRunStatus, AgentStrategy,
    CachedAgentOutput,
};
pub use registry::{
    AgentRegistry, ClassificationAgent, FeedbackLearningAgent, GraphLinkingAgent, LogseqExportAgent,
    MetadataAgent, PatternAgent, PatternDetectionAgent, TopicAgent,
};
pub use repo::{
    AgentRepoError, AgentResultCacheRepo, AgentRunRepo, InMemoryAgentResultCacheRepo,
    InMemoryAgentRunRepo,
};
pub use runner::{AgentRunner, RunRequest};
