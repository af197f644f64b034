// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the ticketing backend.

pub mod auth;
pub mod client_ip;

pub use auth::{bearer_token, require_auth, AuthenticatedUser};
pub use client_ip::ClientIp;
