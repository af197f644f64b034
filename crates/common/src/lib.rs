// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between the ticketing web client and server.
//! This module defines the JSON bodies of the authentication endpoints.

use serde::{Deserialize, Serialize};

/// Body of `POST /auth/register`.
///
/// Every field is optional on the wire so that a missing field is reported
/// as a validation failure instead of a body-parsing failure.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RegisterRequest {
    /// Address the verification link is sent to
    #[serde(default)]
    pub email: Option<String>,
    /// Unique login name
    #[serde(default)]
    pub username: Option<String>,
    /// Plaintext password, hashed before it reaches storage
    #[serde(default)]
    pub password: Option<String>,
}

/// Body of `POST /auth/login`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Successful login: the bearer token to present on protected requests
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    pub token: String,
}

/// Generic `{ "message": ... }` body used for acknowledgements and errors
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
    /// Machine-readable error code, absent on success bodies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl MessageResponse {
    /// Build a success acknowledgement
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Build an error body carrying a code
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

/// Public projection of a user returned by `GET /users/profile`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProfileResponse {
    pub username: String,
    pub email: String,
}
