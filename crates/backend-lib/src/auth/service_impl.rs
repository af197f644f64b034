use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use ticketing_common::{LoginRequest, RegisterRequest};
use uuid::Uuid;

use crate::auth::{
    generate_verification_token, AuthRateLimiter, AuthService, CredentialHasher, HashingError,
    SessionTokenService,
};
use crate::error::{AppError, AuthRejection};
use crate::mailer::NotificationDispatcher;
use crate::metrics::{
    EMAIL_VERIFIED, LOGIN_FAILED, LOGIN_LOCKED, LOGIN_SUCCEEDED, REGISTER_CONFLICT,
    REQUEST_UNAUTHORIZED, USER_REGISTERED,
};
use crate::storage::{NewIdentity, StoreError, UserProfile, UserStore};
use crate::validation::{LoginInput, RegistrationInput};

pub struct DefaultAuth {
    store: Arc<dyn UserStore>,
    hasher: CredentialHasher,
    sessions: Arc<SessionTokenService>,
    notifier: NotificationDispatcher,
    limiter: AuthRateLimiter,
    // Verified against when the username is unknown, so both failure
    // paths pay for one hash.
    dummy_hash: String,
}

impl DefaultAuth {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: CredentialHasher,
        sessions: Arc<SessionTokenService>,
        notifier: NotificationDispatcher,
        limiter: AuthRateLimiter,
    ) -> Result<Self, HashingError> {
        let dummy_hash = hasher.hash(&generate_verification_token())?;
        Ok(Self {
            store,
            hasher,
            sessions,
            notifier,
            limiter,
            dummy_hash,
        })
    }

    fn conflict(err: StoreError) -> AppError {
        if matches!(err, StoreError::DuplicateUsername | StoreError::DuplicateEmail) {
            counter!(REGISTER_CONFLICT).increment(1);
        }
        AppError::from(err)
    }

    fn failed_login() -> AppError {
        counter!(LOGIN_FAILED).increment(1);
        AppError::InvalidCredentials
    }
}

#[async_trait]
impl AuthService for DefaultAuth {
    async fn register(&self, req: RegisterRequest) -> Result<UserProfile, AppError> {
        let input = RegistrationInput::parse(req)?;

        // Fast path only; the store's unique indexes are the real guarantee
        if self.store.find_by_username(&input.username).await?.is_some() {
            return Err(Self::conflict(StoreError::DuplicateUsername));
        }
        if self.store.find_by_email(&input.email).await?.is_some() {
            return Err(Self::conflict(StoreError::DuplicateEmail));
        }

        let password_hash = self.hasher.hash_blocking(input.password).await?;
        let verification_token = generate_verification_token();

        let identity = self
            .store
            .create_unverified(NewIdentity {
                username: input.username,
                email: input.email,
                password_hash,
                verification_token: verification_token.clone(),
            })
            .await
            .map_err(Self::conflict)?;

        counter!(USER_REGISTERED).increment(1);
        tracing::info!(user_id = %identity.id, username = %identity.username, "user registered");

        self.notifier
            .dispatch_verification(identity.email.clone(), &verification_token);

        Ok(identity.profile())
    }

    async fn verify_email(&self, token: &str) -> Result<UserProfile, AppError> {
        let identity = self
            .store
            .find_by_verification_token(token)
            .await?
            .ok_or(AppError::InvalidVerificationToken)?;

        let verified = self
            .store
            .mark_verified(identity.id, token)
            .await
            .map_err(|err| match err {
                // Removed between lookup and update
                StoreError::NotFound => AppError::InvalidVerificationToken,
                other => AppError::from(other),
            })?;

        counter!(EMAIL_VERIFIED).increment(1);
        tracing::info!(user_id = %verified.id, "email verified");
        Ok(verified.profile())
    }

    async fn login(&self, req: LoginRequest, client_ip: IpAddr) -> Result<String, AppError> {
        let input = LoginInput::parse(req)?;

        let Some(attempt) = self.limiter.begin(client_ip, &input.username) else {
            counter!(LOGIN_LOCKED).increment(1);
            tracing::info!(username = %input.username, ip = %client_ip, "login refused, locked out");
            return Err(AppError::AuthRateLimited);
        };

        let Some(identity) = self.store.find_by_username(&input.username).await? else {
            self.hasher
                .verify_blocking(input.password, self.dummy_hash.clone())
                .await?;
            attempt.fail();
            return Err(Self::failed_login());
        };

        if !identity.is_verified {
            tracing::info!(user_id = %identity.id, "login refused, email not verified");
            return Err(AppError::EmailNotVerified);
        }

        let matches = self
            .hasher
            .verify_blocking(input.password, identity.password_hash.clone())
            .await?;
        if !matches {
            attempt.fail();
            return Err(Self::failed_login());
        }

        let token = self.sessions.issue(identity.id)?;
        attempt.succeed();
        counter!(LOGIN_SUCCEEDED).increment(1);
        tracing::info!(user_id = %identity.id, "login succeeded");
        Ok(token)
    }

    async fn authorize(&self, bearer_token: &str) -> Result<UserProfile, AppError> {
        let identity_id = self.sessions.verify(bearer_token).map_err(|err| {
            let err = AppError::from(err);
            if !err.is_server_error() {
                counter!(REQUEST_UNAUTHORIZED).increment(1);
            }
            err
        })?;

        match self.store.find_by_id(identity_id).await? {
            Some(identity) => Ok(identity.profile()),
            None => {
                counter!(REQUEST_UNAUTHORIZED).increment(1);
                Err(AppError::Unauthorized(AuthRejection::UserNotFound))
            },
        }
    }

    async fn profile(&self, id: Uuid) -> Result<UserProfile, AppError> {
        self.store
            .find_by_id(id)
            .await?
            .map(|identity| identity.profile())
            .ok_or_else(|| AppError::NotFound("identity".to_string()))
    }
}
