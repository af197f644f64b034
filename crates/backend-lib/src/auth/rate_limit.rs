// ============================
// crates/backend-lib/src/auth/rate_limit.rs
// ============================
//! Lockout after repeated failed logins.
//!
//! Attempts are keyed by client IP and submitted username together, so one
//! client guessing an account's password is cut off without locking the
//! account's owner out from their own address. A slot is reserved before the
//! password is checked: in-flight attempts count against the limit, so
//! concurrent guesses cannot all slip past it.

use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default number of failed attempts before lockout
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default lockout duration (5 minutes)
const DEFAULT_LOCKOUT_DURATION: Duration = Duration::from_secs(5 * 60);

type AttemptKey = (IpAddr, String);

/// Entry in the rate limit map
#[derive(Debug, Clone)]
struct RateLimitEntry {
    /// Number of failed attempts
    failed_attempts: u32,
    /// Attempts whose password check has not finished
    in_flight: u32,
    /// Time of the last failed attempt
    last_failure: Instant,
    /// When the lockout expires
    lockout_expiry: Option<Instant>,
}

impl RateLimitEntry {
    fn is_idle(&self) -> bool {
        self.failed_attempts == 0 && self.in_flight == 0 && self.lockout_expiry.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Failed,
    Succeeded,
    Abandoned,
}

/// Rate limiter for login attempts
#[derive(Debug, Clone)]
pub struct AuthRateLimiter {
    attempts: Arc<DashMap<AttemptKey, RateLimitEntry>>,
    max_attempts: u32,
    lockout_duration: Duration,
}

impl Default for AuthRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_LOCKOUT_DURATION)
    }
}

/// A reserved login attempt.
///
/// Settle it with [`LoginAttempt::fail`] or [`LoginAttempt::succeed`].
/// Dropping it unsettled gives the slot back without counting a failure.
#[derive(Debug)]
pub struct LoginAttempt {
    limiter: AuthRateLimiter,
    key: Option<AttemptKey>,
}

impl LoginAttempt {
    /// The password was wrong (or the username unknown)
    pub fn fail(mut self) {
        if let Some(key) = self.key.take() {
            self.limiter.settle(key, Outcome::Failed);
        }
    }

    /// The password matched; clears the failure count
    pub fn succeed(mut self) {
        if let Some(key) = self.key.take() {
            self.limiter.settle(key, Outcome::Succeeded);
        }
    }
}

impl Drop for LoginAttempt {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.limiter.settle(key, Outcome::Abandoned);
        }
    }
}

impl AuthRateLimiter {
    /// Create a new auth rate limiter
    pub fn new(max_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            attempts: Arc::new(DashMap::new()),
            max_attempts,
            lockout_duration,
        }
    }

    /// Reserve an attempt for `username` from `ip`.
    ///
    /// `None` while locked out, or while earlier failures plus attempts still
    /// in flight already reach the limit.
    pub fn begin(&self, ip: IpAddr, username: &str) -> Option<LoginAttempt> {
        let now = Instant::now();
        let key = (ip, username.to_string());

        let mut entry = self
            .attempts
            .entry(key.clone())
            .or_insert_with(|| RateLimitEntry {
                failed_attempts: 0,
                in_flight: 0,
                last_failure: now,
                lockout_expiry: None,
            });

        // Start over once a previous lockout has run out
        if entry.lockout_expiry.is_some_and(|expiry| now >= expiry) {
            entry.failed_attempts = 0;
            entry.lockout_expiry = None;
        }

        if entry.lockout_expiry.is_some()
            || entry.failed_attempts + entry.in_flight >= self.max_attempts
        {
            return None;
        }

        entry.in_flight += 1;
        Some(LoginAttempt {
            limiter: self.clone(),
            key: Some(key),
        })
    }

    fn settle(&self, key: AttemptKey, outcome: Outcome) {
        let now = Instant::now();

        if let Some(mut entry) = self.attempts.get_mut(&key) {
            entry.in_flight = entry.in_flight.saturating_sub(1);
            match outcome {
                Outcome::Failed => {
                    entry.failed_attempts += 1;
                    entry.last_failure = now;
                    if entry.failed_attempts >= self.max_attempts && entry.lockout_expiry.is_none()
                    {
                        entry.lockout_expiry = Some(now + self.lockout_duration);
                        tracing::warn!(ip = %key.0, username = %key.1, "login locked out after repeated failures");
                    }
                },
                Outcome::Succeeded => {
                    entry.failed_attempts = 0;
                    entry.lockout_expiry = None;
                },
                Outcome::Abandoned => {},
            }
        }

        self.attempts.remove_if(&key, |_, entry| entry.is_idle());
    }

    /// Whether `username` from `ip` is currently locked out
    pub fn is_locked(&self, ip: IpAddr, username: &str) -> bool {
        self.attempts
            .get(&(ip, username.to_string()))
            .and_then(|entry| entry.lockout_expiry)
            .is_some_and(|expiry| Instant::now() < expiry)
    }

    /// Clean up expired lockouts and stale counters
    pub fn cleanup(&self) {
        let now = Instant::now();

        self.attempts.retain(|_, entry| {
            if entry.in_flight > 0 {
                return true;
            }
            if let Some(expiry) = entry.lockout_expiry {
                return now < expiry;
            }

            // Otherwise, keep entries for a day
            now.duration_since(entry.last_failure) < Duration::from_secs(24 * 60 * 60)
        });
    }

    /// Run `cleanup` every `every` on a background task
    pub fn spawn_cleanup(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                limiter.cleanup();
            }
        })
    }

    /// Number of (ip, username) pairs currently tracked
    pub fn tracked(&self) -> usize {
        self.attempts.len()
    }
}
