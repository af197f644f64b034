// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const USER_REGISTERED: &str = "auth.user.registered";
pub const REGISTER_CONFLICT: &str = "auth.register.conflict";
pub const EMAIL_VERIFIED: &str = "auth.email.verified";
pub const LOGIN_SUCCEEDED: &str = "auth.login.succeeded";
pub const LOGIN_FAILED: &str = "auth.login.failed";
pub const LOGIN_LOCKED: &str = "auth.login.locked";
pub const REQUEST_UNAUTHORIZED: &str = "auth.request.unauthorized";
pub const MAIL_FAILED: &str = "mail.verification.failed";
