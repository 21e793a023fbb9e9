pub mod clock;
pub mod config;
pub mod error;
pub mod hashing;
pub mod ids;
pub mod scope;
pub mod tenant;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, ServerConfig};
pub use error::{Classify, CoreError, ErrorKind, ErrorResponse};
pub use ids::*;
pub use scope::Scope;
pub use tenant::{Actor, TenantContext, TenantSessionVars};
