// ============================
// ticketing-backend-lib/src/auth/session.rs
// ============================
//! Bearer session tokens.
//!
//! Tokens are HS256 JWTs carrying `{ sub, iat, exp }`. Nothing is stored
//! server-side: validity depends only on the signature and `exp`.
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Session TTL (time to live)
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Identity id
    pub sub: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiry (Unix seconds)
    pub exp: i64,
}

/// Session token failures
#[derive(Error, Debug)]
pub enum SessionError {
    /// No signing secret configured; the service is fail-closed
    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("token expired")]
    TokenExpired,

    #[error("token malformed")]
    TokenMalformed,

    #[error("token signing failed: {0}")]
    Signing(String),
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Issues and verifies signed, time-bound bearer tokens
pub struct SessionTokenService {
    keys: Option<Keys>,
    validation: Validation,
}

impl fmt::Debug for SessionTokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokenService")
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl SessionTokenService {
    /// Create the service. `None` or an empty secret leaves it fail-closed.
    pub fn new(secret: Option<&str>) -> Self {
        let keys = secret.filter(|s| !s.is_empty()).map(|s| Keys {
            encoding: EncodingKey::from_secret(s.as_bytes()),
            decoding: DecodingKey::from_secret(s.as_bytes()),
        });

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against our own clock in `verify_at`
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims =
            HashSet::from(["exp".to_string(), "sub".to_string()]);

        Self { keys, validation }
    }

    /// Whether a signing secret is present
    pub fn is_configured(&self) -> bool {
        self.keys.is_some()
    }

    /// Issue a token for `identity_id` expiring one hour from now
    pub fn issue(&self, identity_id: Uuid) -> Result<String, SessionError> {
        self.issue_at(identity_id, Utc::now())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(&self, identity_id: Uuid, now: DateTime<Utc>) -> Result<String, SessionError> {
        let keys = self.keys.as_ref().ok_or(SessionError::MissingSecret)?;
        let iat = now.timestamp();
        let claims = Claims {
            sub: identity_id.to_string(),
            iat,
            exp: iat + SESSION_TTL.as_secs() as i64,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| SessionError::Signing(e.to_string()))
    }

    /// Verify a token and return the identity id it was issued for
    pub fn verify(&self, token: &str) -> Result<Uuid, SessionError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as if the current time were `now`
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, SessionError> {
        let keys = self.keys.as_ref().ok_or(SessionError::MissingSecret)?;
        let data = decode::<Claims>(token, &keys.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => SessionError::TokenExpired,
                _ => SessionError::TokenMalformed,
            }
        })?;

        if now.timestamp() >= data.claims.exp {
            return Err(SessionError::TokenExpired);
        }

        Uuid::parse_str(&data.claims.sub).map_err(|_| SessionError::TokenMalformed)
    }
}
