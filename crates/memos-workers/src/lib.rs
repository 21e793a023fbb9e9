//! Maintenance workers (C9, §4.5). All run under a `system` tenant context
//! (§4.1) so RLS still applies, and none ever surface a failure to a user —
//! transient errors retry with backoff, terminal ones are logged and dropped.

pub mod access_counter;
pub mod causal_refresh;
pub mod coactivation_worker;
pub mod decay;
pub mod error;

pub use access_counter::bump_access_counter;
pub use causal_refresh::{refresh_causal_hypotheses, refresh_causal_hypotheses_with, DEFAULT_MIN_EDGE_WEIGHT};
pub use coactivation_worker::{update_coactivation, update_coactivation_with};
pub use decay::{run_nightly_decay, run_nightly_decay_with, DecayReport, DEFAULT_PRUNE_MIN_WEIGHT, DEFAULT_PRUNE_OLDER_THAN_DAYS};
pub use error::{with_retry, WorkerError};
