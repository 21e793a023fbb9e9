pub mod explanation;
pub mod feedback;
pub mod model;
pub mod scoring;
pub mod search;

pub use explanation::{ExplanationError, ExplanationSink, InMemoryExplanationSink};
pub use feedback::{FeedbackRepo, InMemoryFeedbackRepo};
pub use model::{
    ActivationComponents, Affinity, ContextAffinities, FeedbackSignal, GatingInfo,
    ProvenanceRecord, RelevanceFeedback, RetrievalExplanation, RetrievalResultExplanation,
    RetrievedMemory, SearchMode, SearchRequest,
};
pub use search::{SearchConfig, SearchEngine};
