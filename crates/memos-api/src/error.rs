//! Uniform `{detail, code}` error envelope (§6), built on the `Classify`
//! contract every service-layer error implements.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use memos_core::error::{Classify, ErrorResponse};

pub struct ApiError(ErrorResponse, StatusCode);

impl<E: Classify + ToString> From<E> for ApiError {
    fn from(err: E) -> Self {
        let (status, body) = ErrorResponse::from_classified(&err);
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self(body, status)
    }
}

impl ApiError {
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self(ErrorResponse { detail: detail.into(), code: "AuthorizationDenied".to_string() }, StatusCode::UNAUTHORIZED)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self(ErrorResponse { detail: detail.into(), code: "NotFound".to_string() }, StatusCode::NOT_FOUND)
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        Self(ErrorResponse { detail: detail.into(), code: "Validation".to_string() }, StatusCode::UNPROCESSABLE_ENTITY)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.1, Json(self.0)).into_response()
    }
}
