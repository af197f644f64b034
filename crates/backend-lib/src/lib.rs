// ============================
// ticketing-backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the ticketing server: user
//! registration with email verification, login, and bearer-token
//! authorization of protected routes.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod storage;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthRateLimiter, AuthService, CredentialHasher, DefaultAuth, SessionTokenService};
use crate::config::{Settings, StorageKind};
use crate::mailer::{mailer_from_settings, Mailer, NotificationDispatcher};
use crate::storage::{FlatFileUserStore, MemoryUserStore, UserStore};

pub use router::create_router;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth: Arc<dyn AuthService>,
    /// Identity store
    pub store: Arc<dyn UserStore>,
    /// Immutable settings
    pub settings: Arc<Settings>,
    /// Failed-login lockout
    pub rate_limiter: AuthRateLimiter,
}

impl AppState {
    /// Create a new application state from explicit collaborators
    pub fn new(
        store: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
        settings: Settings,
    ) -> anyhow::Result<Self> {
        let hasher = CredentialHasher::new(settings.auth.scrypt_log_n)?;

        let sessions = Arc::new(SessionTokenService::new(settings.jwt_secret()));
        if !sessions.is_configured() {
            tracing::warn!("JWT secret not configured; logins and protected routes will fail");
        }

        let notifier = NotificationDispatcher::new(mailer, &settings.mail.public_base_url);
        let rate_limiter = AuthRateLimiter::new(
            settings.auth.max_failed_logins,
            Duration::from_secs(settings.auth.lockout_secs),
        );

        let auth = Arc::new(DefaultAuth::new(
            store.clone(),
            hasher,
            sessions,
            notifier,
            rate_limiter.clone(),
        )?);

        Ok(Self {
            auth,
            store,
            settings: Arc::new(settings),
            rate_limiter,
        })
    }

    /// Create the application state the settings describe: store backend and mailer
    pub async fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let store: Arc<dyn UserStore> = match settings.storage {
            StorageKind::Memory => Arc::new(MemoryUserStore::new()),
            StorageKind::File => Arc::new(FlatFileUserStore::open(&settings.data_dir).await?),
        };
        let mailer = mailer_from_settings(&settings.mail)?;
        Self::new(store, mailer, settings)
    }
}
