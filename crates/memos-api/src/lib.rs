//! HTTP surface (§6): the axum router wiring the service layer behind
//! bearer-token auth and the uniform `{detail, code}` error envelope.
//!
//! Agent-run and staged-rollout administration are not exposed here —
//! neither appears in the representative endpoint list, and both stay
//! internal/CLI collaborators.

pub mod admin;
pub mod auth;
pub mod coactivation;
pub mod error;
pub mod explanations;
pub mod goals;
pub mod memories;
pub mod pipelines;
pub mod server;
pub mod state;

pub use auth::{AuthRejected, AuthenticatedTenant, Claims};
pub use error::ApiError;
pub use server::ApiServer;
pub use state::ApiState;
