// ============================
// crates/backend-lib/src/middleware/auth.rs
// ============================
//! Bearer-token authorization for protected routes.
//!
//! Each request is authenticated on its own:
//! 1. no `Authorization: Bearer <token>` header → 401 "no token"
//! 2. token verified → expired / invalid → 401
//! 3. identity resolved by the token subject → missing → 401 "user not found"
//! 4. the resolved identity is attached to the request extensions
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::error::{AppError, AuthRejection};
use crate::storage::UserProfile;
use crate::AppState;

/// Identity attached to a request that passed `require_auth`
#[derive(Clone, Debug)]
pub struct AuthenticatedUser(pub UserProfile);

/// Pull the token out of `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

/// Authorization middleware
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path().to_string();
    let Some(token) = bearer_token(request.headers()).map(str::to_string) else {
        tracing::warn!(%path, "missing bearer token");
        return Err(AppError::Unauthorized(AuthRejection::NoToken));
    };

    let profile = state.auth.authorize(&token).await.map_err(|err| {
        tracing::warn!(%path, error = %err, "authorization rejected");
        err
    })?;

    tracing::debug!(user_id = %profile.id, "request authorized");
    request.extensions_mut().insert(AuthenticatedUser(profile));
    Ok(next.run(request).await)
}

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| {
                tracing::warn!("AuthenticatedUser not found in request extensions");
                AppError::Unauthorized(AuthRejection::NoToken)
            })
    }
}
