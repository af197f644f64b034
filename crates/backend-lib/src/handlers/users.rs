// ============================
// crates/backend-lib/src/handlers/users.rs
// ============================
//! `/users` handlers. Every route here sits behind `require_auth`.
use std::sync::Arc;

use axum::{extract::State, Json};
use ticketing_common::ProfileResponse;

use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::AppState;

/// `GET /users/profile`
pub async fn profile(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<ProfileResponse>, AppError> {
    // Re-read so an identity removed after authorization answers 404
    let profile = state.auth.profile(user.id).await?;
    Ok(Json(ProfileResponse {
        username: profile.username,
        email: profile.email,
    }))
}
