// ============================
// crates/backend-lib/src/handlers/auth.rs
// ============================
//! `/auth` handlers: register, verify, login.
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    Json,
};
use ticketing_common::{LoginRequest, LoginResponse, MessageResponse, RegisterRequest};

use crate::error::AppError;
use crate::middleware::ClientIp;
use crate::validation::ValidationError;
use crate::AppState;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| ValidationError::InvalidBody(rejection.body_text()).into())
}

/// `POST /auth/register`
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = body(payload)?;
    state.auth.register(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User registered successfully")),
    ))
}

/// `GET /auth/verify/{token}`
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Redirect, AppError> {
    state.auth.verify_email(&token).await?;
    Ok(Redirect::to(&state.settings.mail.verified_redirect_url))
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    ClientIp(client_ip): ClientIp,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let req = body(payload)?;
    let token = state.auth.login(req, client_ip).await?;
    Ok(Json(LoginResponse { token }))
}
