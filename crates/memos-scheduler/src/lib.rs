pub mod model;
pub mod queue;
pub mod service;

pub use model::{DeadLetterEntry, PipelineTask, QueueStats, TaskStatus};
pub use queue::{InMemoryTaskQueue, SchedulerError, TaskQueue};
pub use service::{SchedulerService, SchedulerServiceError};
