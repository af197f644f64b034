// ============================
// ticketing-backend-lib/src/config.rs
// ============================
//! Configuration management.
//!
//! Settings are built once at process start and shared read-only behind an
//! `Arc`. Sources are merged in order: built-in defaults, `config.toml`,
//! then `TICKETING_`-prefixed environment variables (`__` separates nested
//! keys, e.g. `TICKETING_AUTH__JWT_SECRET`).
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "TICKETING_";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A configuration value that must never be printed.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Which identity store backs the user directory
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Process-local, lost on restart
    Memory,
    /// `users.json` under `data_dir`
    File,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Data directory path
    pub data_dir: PathBuf,
    /// Log level
    pub log_level: String,
    /// Identity store backend
    pub storage: StorageKind,
    /// Token signing and credential settings
    pub auth: AuthSettings,
    /// Outbound verification mail
    pub mail: MailSettings,
}

/// Authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// HMAC secret for bearer tokens. When absent the token service
    /// refuses to issue or verify anything.
    #[serde(default)]
    pub jwt_secret: Option<Secret>,
    /// scrypt cost parameter (log2 of N)
    pub scrypt_log_n: u8,
    /// Consecutive failed logins before a username is locked
    pub max_failed_logins: u32,
    /// Lockout duration in seconds
    pub lockout_secs: u64,
}

/// Mail settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailSettings {
    /// SMTP relay; verification links are only logged when unset
    #[serde(default)]
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<Secret>,
    /// `From:` header of verification mail
    pub from_address: String,
    /// Externally reachable base URL of this server, used to build links
    pub public_base_url: String,
    /// Where a successfully verified user is sent
    pub verified_redirect_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            data_dir: PathBuf::from("data"),
            log_level: "info".to_string(),
            storage: StorageKind::File,
            auth: AuthSettings::default(),
            mail: MailSettings::default(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            scrypt_log_n: crate::auth::password::DEFAULT_LOG_N,
            max_failed_logins: 5,
            lockout_secs: 5 * 60, // 5 minutes
        }
    }
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            from_address: "Ticketing <no-reply@localhost>".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            verified_redirect_url: "http://localhost:5173/login".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `config.toml` in the working directory and the environment
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    /// Load settings from an explicit TOML file and the environment.
    /// A missing file is not an error; defaults apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the server cannot run with.
    ///
    /// A missing signing secret is not rejected here; the token
    /// service starts fail-closed and login answers 500 until it is set.
    pub fn validate(&self) -> Result<()> {
        if !VALID_LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            bail!("invalid log level: {}", self.log_level);
        }
        if self.auth.max_failed_logins == 0 {
            bail!("auth.max_failed_logins must be at least 1");
        }
        if self.auth.lockout_secs == 0 {
            bail!("auth.lockout_secs must be positive");
        }
        if !(10..=20).contains(&self.auth.scrypt_log_n) {
            bail!("auth.scrypt_log_n must be between 10 and 20");
        }
        if self.mail.public_base_url.trim().is_empty() {
            bail!("mail.public_base_url must not be empty");
        }
        Ok(())
    }

    /// Signing secret, if one is configured and non-empty
    pub fn jwt_secret(&self) -> Option<&str> {
        self.auth
            .jwt_secret
            .as_ref()
            .map(Secret::expose)
            .filter(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_validation() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());

        let mut invalid = settings.clone();
        invalid.log_level = "loud".to_string();
        assert!(invalid.validate().is_err());

        let mut invalid = settings.clone();
        invalid.auth.max_failed_logins = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = settings.clone();
        invalid.auth.scrypt_log_n = 4;
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_missing_secret_is_not_a_startup_error() {
        let settings = Settings::default();
        assert!(settings.jwt_secret().is_none());
        assert!(settings.validate().is_ok());

        let mut blank = settings;
        blank.auth.jwt_secret = Some(Secret::new("   "));
        assert!(blank.jwt_secret().is_none());
    }

    #[test]
    fn test_secret_is_redacted_in_debug() {
        let mut settings = Settings::default();
        settings.auth.jwt_secret = Some(Secret::new("hunter2"));
        let printed = format!("{settings:?}");
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("Secret(***)"));
    }

    #[test]
    fn test_load_settings() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "ticketing.toml",
                r#"
                bind_addr = "0.0.0.0:8080"
                log_level = "debug"
                storage = "memory"

                [auth]
                scrypt_log_n = 12
                "#,
            )?;
            jail.set_env("TICKETING_LOG_LEVEL", "warn");
            jail.set_env("TICKETING_AUTH__JWT_SECRET", "from-env");

            let settings = Settings::load_from("ticketing.toml").expect("settings load");
            assert_eq!(settings.bind_addr.to_string(), "0.0.0.0:8080");
            assert_eq!(settings.storage, StorageKind::Memory);
            assert_eq!(settings.auth.scrypt_log_n, 12);
            // Environment variable takes precedence
            assert_eq!(settings.log_level, "warn");
            assert_eq!(settings.jwt_secret(), Some("from-env"));
            // Untouched values keep their defaults
            assert_eq!(settings.auth.max_failed_logins, 5);
            Ok(())
        });
    }
}
