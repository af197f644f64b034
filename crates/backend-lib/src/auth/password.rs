// ============================
// ticketing-backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
//!
//! Hashes are scrypt PHC strings with the salt and cost embedded, so a
//! stored hash verifies correctly even after the configured cost changes.
use scrypt::{
    password_hash::{
        rand_core::OsRng, Error as PasswordHashError, PasswordHash, PasswordHasher,
        PasswordVerifier, SaltString,
    },
    Params, Scrypt,
};
use thiserror::Error;
use zeroize::Zeroize;

/// Default scrypt cost (N = 2^15, roughly 50-100ms on commodity hardware)
pub const DEFAULT_LOG_N: u8 = 15;

/// Infrastructure failure while hashing or verifying.
///
/// Never used to signal a wrong password.
#[derive(Error, Debug)]
pub enum HashingError {
    #[error("invalid scrypt parameters: {0}")]
    Params(String),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// One-way credential hasher with a fixed cost
#[derive(Clone, Copy, Debug)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    /// Build a hasher with cost `N = 2^log_n`
    pub fn new(log_n: u8) -> Result<Self, HashingError> {
        let params = Params::new(log_n, 8, 1, Params::RECOMMENDED_LEN)
            .map_err(|e| HashingError::Params(e.to_string()))?;
        Ok(Self { params })
    }

    /// Hash a password using scrypt with a fresh random salt
    pub fn hash(&self, plain: &str) -> Result<String, HashingError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Scrypt
            .hash_password_customized(plain.as_bytes(), None, None, self.params, &salt)
            .map_err(|e| HashingError::Hash(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    /// Verify a password against a stored hash.
    ///
    /// `Ok(false)` means the password is wrong; an unparseable hash is an error.
    /// The digest comparison is constant-time.
    pub fn verify(&self, plain: &str, hash: &str) -> Result<bool, HashingError> {
        let parsed = PasswordHash::new(hash).map_err(|e| HashingError::Hash(e.to_string()))?;
        match Scrypt.verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(PasswordHashError::Password) => Ok(false),
            Err(e) => Err(HashingError::Hash(e.to_string())),
        }
    }

    /// Hash on the blocking pool and zeroize the caller's plaintext
    pub async fn hash_blocking(&self, mut plain: String) -> Result<String, HashingError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || {
            let result = hasher.hash(&plain);
            plain.zeroize();
            result
        })
        .await?
    }

    /// Verify on the blocking pool and zeroize the caller's plaintext
    pub async fn verify_blocking(
        &self,
        mut plain: String,
        hash: String,
    ) -> Result<bool, HashingError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || {
            let result = hasher.verify(&plain, &hash);
            plain.zeroize();
            result
        })
        .await?
    }
}
