//! Bearer-token auth gate.
//!
//! Every protected route carries a `{user_id}` path segment. The gate
//! verifies the credential against the identity provider and rejects any
//! request whose verified subject does not own that path, so users can
//! only ever touch their own data. Verification failures are terminal
//! for the request - no retries.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::routes::AppState;
use crate::error::ApiError;
use crate::identity::{Claims, VerifyError};

/// Verified identity, attached to request extensions by the gate.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    Path(params): Path<HashMap<String, String>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match authenticate(&state, &params, req.headers()).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}

async fn authenticate(
    state: &AppState,
    params: &HashMap<String, String>,
    headers: &axum::http::HeaderMap,
) -> Result<AuthUser, ApiError> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if auth_header.is_empty() {
        return Err(ApiError::Unauthorized(
            "Authorization header missing".to_string(),
        ));
    }

    let token = auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .unwrap_or(auth_header);

    let claims = state.verifier.verify(token).await.map_err(|e| match e {
        VerifyError::Invalid(detail) => {
            tracing::warn!("token verification failed: {}", detail);
            ApiError::Unauthorized("Invalid or expired token".to_string())
        }
        VerifyError::Unavailable(detail) => {
            tracing::error!("identity provider unreachable: {}", detail);
            ApiError::Unavailable
        }
    })?;

    if let Some(user_id) = params.get("user_id") {
        if user_id != &claims.sub {
            tracing::warn!(
                subject = %claims.sub,
                target = %user_id,
                "cross-user access rejected"
            );
            return Err(ApiError::Forbidden);
        }
    }

    Ok(AuthUser(claims))
}
