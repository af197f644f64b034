// ============================
// ticketing-backend-lib/src/mailer.rs
// ============================
//! Verification mail delivery.
//!
//! Delivery is fire-and-forget from the registration flow's point of view:
//! failures are logged and counted, never returned to the registrant.
use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use crate::config::MailSettings;
use crate::metrics::MAIL_FAILED;

/// Mail delivery failures
#[derive(Error, Debug)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("could not build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Outbound channel for verification links
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, verification_link: &str) -> Result<(), MailError>;
}

/// Logs the link instead of sending it. Used when no SMTP relay is configured.
///
/// The link carries a live verification token, so it only appears at `debug`.
#[derive(Clone, Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, verification_link: &str) -> Result<(), MailError> {
        tracing::info!(to, "verification mail not sent, no SMTP relay configured");
        tracing::debug!(to, verification_link, "verification mail (log only)");
        Ok(())
    }
}

/// SMTP delivery through a STARTTLS relay
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(host: &str, settings: &MailSettings) -> Result<Self, MailError> {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?.port(settings.smtp_port);

        if let (Some(user), Some(pass)) = (&settings.smtp_username, &settings.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.expose().to_string()));
        }

        Ok(Self {
            transport: builder.build(),
            from: settings.from_address.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, verification_link: &str) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.parse()?)
            .to(to.parse()?)
            .subject("Please Verify Your Email Address")
            .header(ContentType::TEXT_HTML)
            .body(verification_body(verification_link))?;

        self.transport.send(message).await?;
        Ok(())
    }
}

fn verification_body(link: &str) -> String {
    format!(
        "<h2>Email Verification</h2>\
         <p>Thank you for registering. Please click the link below to verify your email address:</p>\
         <a href=\"{link}\" target=\"_blank\">Verify Email</a>\
         <p>If you did not create an account, please ignore this email.</p>"
    )
}

/// Pick the mailer for the given settings
pub fn mailer_from_settings(settings: &MailSettings) -> Result<Arc<dyn Mailer>, MailError> {
    match settings.smtp_host.as_deref().filter(|h| !h.is_empty()) {
        Some(host) => {
            tracing::info!(host, port = settings.smtp_port, "using SMTP mailer");
            Ok(Arc::new(SmtpMailer::new(host, settings)?))
        },
        None => {
            tracing::warn!("no SMTP host configured, verification links will only be logged");
            Ok(Arc::new(LogMailer))
        },
    }
}

/// Builds verification links and hands them to a `Mailer` in the background
#[derive(Clone)]
pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
    base_url: String,
}

impl NotificationDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, public_base_url: &str) -> Self {
        Self {
            mailer,
            base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Link the user follows to verify their address
    pub fn verification_link(&self, token: &str) -> String {
        format!("{}/auth/verify/{token}", self.base_url)
    }

    /// Send the verification link without waiting for delivery
    pub fn dispatch_verification(&self, to: String, token: &str) -> tokio::task::JoinHandle<()> {
        let mailer = self.mailer.clone();
        let link = self.verification_link(token);
        tokio::spawn(async move {
            match mailer.send(&to, &link).await {
                Ok(()) => tracing::info!(to = %to, "verification email sent"),
                Err(err) => {
                    metrics::counter!(MAIL_FAILED).increment(1);
                    tracing::error!(to = %to, error = %err, "error sending verification email");
                },
            }
        })
    }
}
