// ============================
// ticketing-backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod password;
pub mod rate_limit;
pub mod session;
pub mod token_generator;
mod service;
mod service_impl;

pub use password::{CredentialHasher, HashingError};
pub use rate_limit::AuthRateLimiter;
pub use session::{Claims, SessionError, SessionTokenService, SESSION_TTL};
pub use service::AuthService;
pub use service_impl::DefaultAuth;
pub use token_generator::generate_verification_token;
