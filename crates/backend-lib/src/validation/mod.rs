// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Request validation at the HTTP boundary.
//!
//! Everything here runs before the identity store is touched.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use ticketing_common::{LoginRequest, RegisterRequest};

const MIN_EMAIL_LENGTH: usize = 5;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit
const MAX_USERNAME_LENGTH: usize = 64;
const MAX_PASSWORD_LENGTH: usize = 128;

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern"));

/// Possible validation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Username, password, and email are required (missing {0})")]
    MissingFields(&'static str),

    #[error("Username and password are required")]
    MissingCredentials,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validated registration input; username trimmed, email normalized
#[derive(Clone)]
pub struct RegistrationInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegistrationInput {
    pub fn parse(req: RegisterRequest) -> ValidationResult<Self> {
        let email = present(req.email, "email")?;
        let username = present(req.username, "username")?;
        let password = present(req.password, "password")?;

        Ok(Self {
            username: validate_username(&username)?,
            email: validate_email(&email)?,
            password: validate_password(password)?,
        })
    }
}

/// Validated login input
#[derive(Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

impl LoginInput {
    pub fn parse(req: LoginRequest) -> ValidationResult<Self> {
        let (Some(username), Some(password)) = (req.username, req.password) else {
            return Err(ValidationError::MissingCredentials);
        };
        if username.is_empty() || password.is_empty() {
            return Err(ValidationError::MissingCredentials);
        }

        Ok(Self {
            username: validate_username(&username)?,
            password: validate_password(password)?,
        })
    }
}

fn present(field: Option<String>, name: &'static str) -> ValidationResult<String> {
    match field {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ValidationError::MissingFields(name)),
    }
}

/// Trim a username and check it is usable
pub fn validate_username(username: &str) -> ValidationResult<String> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ValidationError::InvalidUsername(
            "Username must not be empty".to_string(),
        ));
    }

    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::InvalidUsername(format!(
            "Username cannot exceed {MAX_USERNAME_LENGTH} characters"
        )));
    }

    if username.chars().any(char::is_control) {
        return Err(ValidationError::InvalidUsername(
            "Username contains invalid characters".to_string(),
        ));
    }

    Ok(username.to_string())
}

/// Validate a password. Passwords are never trimmed.
pub fn validate_password(password: String) -> ValidationResult<String> {
    if password.is_empty() {
        return Err(ValidationError::InvalidPassword(
            "Password must not be empty".to_string(),
        ));
    }

    if password.chars().count() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::InvalidPassword(format!(
            "Password cannot exceed {MAX_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(password)
}

/// Validate an email address and return its canonical (trimmed, lowercased) form
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = email.trim().to_lowercase();

    if email.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::InvalidEmail(format!(
            "Email address must be at least {MIN_EMAIL_LENGTH} characters"
        )));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::InvalidEmail(format!(
            "Email address cannot exceed {MAX_EMAIL_LENGTH} characters"
        )));
    }

    if !EMAIL_REGEX.is_match(&email) {
        return Err(ValidationError::InvalidEmail(
            "Please enter a valid email address".to_string(),
        ));
    }

    Ok(email)
}
