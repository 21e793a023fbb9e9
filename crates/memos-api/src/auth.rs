//! Bearer token verification (§6: "JWT-shaped; claims sub, org, roles, exp.
//! Algorithm & key management are external collaborators"). This module
//! only verifies and decodes what the gateway or IdP already issued; it
//! never signs a token.

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use memos_core::{OrganizationId, TenantContext, UserId};
use serde::Deserialize;

use crate::state::ApiState;

#[derive(Debug, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub org: OrganizationId,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub clearance: i32,
    pub exp: i64,
}

pub struct AuthRejected(pub String);

impl IntoResponse for AuthRejected {
    fn into_response(self) -> Response {
        let body = memos_core::error::ErrorResponse { detail: self.0, code: "AuthorizationDenied".to_string() };
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Extracts a [`TenantContext`] from the `Authorization: Bearer <jwt>` header.
pub struct AuthenticatedTenant(pub TenantContext);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedTenant
where
    ApiState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejected;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let api_state = ApiState::from_ref(state);
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AuthRejected("missing bearer token".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AuthRejected("authorization header is not a bearer token".to_string()))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 60;
        let decoded = decode::<Claims>(token, &DecodingKey::from_secret(api_state.jwt_secret.as_bytes()), &validation)
            .map_err(|err| AuthRejected(format!("invalid token: {err}")))?;

        let claims = decoded.claims;
        Ok(Self(TenantContext::for_user(claims.sub, claims.org, claims.roles, claims.clearance)))
    }
}
