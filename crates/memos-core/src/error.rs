//! Error kinds shared across crates, per spec §7. Concrete crates define
//! their own `thiserror` enums; this one exists so HTTP-facing code can map
//! any of them onto the uniform `{detail, code}` contract without knowing
//! which crate produced the failure.

use serde::Serialize;
use thiserror::Error;

/// Contract-level error classification (§7). Not a type any crate returns
/// directly -- each crate's error enum implements `ErrorKind::classify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AuthorizationDenied,
    TenantMismatch,
    NotFound,
    Validation,
    Conflict,
    QuotaExhausted,
    UpstreamUnavailable,
    Internal,
}

impl ErrorKind {
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::AuthorizationDenied => 403,
            ErrorKind::TenantMismatch => 404,
            ErrorKind::NotFound => 404,
            ErrorKind::Validation => 422,
            ErrorKind::Conflict => 409,
            ErrorKind::QuotaExhausted => 429,
            ErrorKind::UpstreamUnavailable => 503,
            ErrorKind::Internal => 500,
        }
    }
}

pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl Classify for CoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound => ErrorKind::NotFound,
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Uniform error body returned to HTTP callers (§6).
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn from_classified<E: Classify + ToString>(err: &E) -> (u16, Self) {
        let kind = err.kind();
        (
            kind.http_status(),
            Self {
                detail: err.to_string(),
                code: format!("{kind:?}"),
            },
        )
    }
}
