pub mod causal;
pub mod coactivation;
pub mod lexical;
pub mod model;
pub mod repo;
pub mod store;
pub mod vector_index;

pub use causal::{
    refresh_hypothesis, CausalHypothesis, CausalHypothesisError, CausalHypothesisRepo,
    HypothesisStatus, InMemoryCausalHypothesisRepo,
};
pub use coactivation::{
    CoactivationEdge, CoactivationError, CoactivationRepo, InMemoryCoactivationRepo,
    COACTIVATION_LAMBDA,
};
pub use lexical::{InMemoryLexicalIndex, LexicalIndex, LexicalIndexError, LexicalSearchHit};
pub use model::{ActivationState, Classification, Memory, MemoryType, SearchMode, VectorPayload};
pub use repo::{
    ActivationRepo, InMemoryActivationRepo, InMemoryMemoryRepo, MemoryRepo, StoreError,
};
pub use store::{compute_content_hash, CreateMemoryInput, MemoryServiceError, MemoryStore};
pub use vector_index::{InMemoryVectorIndex, VectorIndex, VectorIndexError, VectorSearchHit};
