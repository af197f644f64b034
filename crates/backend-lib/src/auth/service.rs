use std::net::IpAddr;

use async_trait::async_trait;
use ticketing_common::{LoginRequest, RegisterRequest};
use uuid::Uuid;

use crate::error::AppError;
use crate::storage::UserProfile;

/// Registration, verification, login and per-request authorization
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create an unverified identity and send its verification link.
    /// The verification token is never part of the result.
    async fn register(&self, req: RegisterRequest) -> Result<UserProfile, AppError>;

    /// Consume a verification token
    async fn verify_email(&self, token: &str) -> Result<UserProfile, AppError>;

    /// Check credentials and issue a bearer token. Failed attempts are
    /// counted per `client_ip` and username.
    async fn login(&self, req: LoginRequest, client_ip: IpAddr) -> Result<String, AppError>;

    /// Resolve a bearer token to the identity it was issued for
    async fn authorize(&self, bearer_token: &str) -> Result<UserProfile, AppError>;

    /// Fresh profile for an already-authorized identity
    async fn profile(&self, id: Uuid) -> Result<UserProfile, AppError>;
}
