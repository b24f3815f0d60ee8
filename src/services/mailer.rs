//! Invite email notification
//!
//! Notification is best-effort by contract: it runs only after the invite
//! rows are durable, is never retried synchronously, and a failure surfaces
//! to callers solely as the `email_not_sent` flag on an otherwise
//! successful result.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::config::SmtpConfig;
use crate::models::Organization;

#[async_trait]
pub trait InviteNotifier: Send + Sync {
    async fn send_invite(
        &self,
        email: &str,
        organization: &Organization,
        invite_code: &str,
    ) -> Result<()>;
}

/// SMTP-backed notifier
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    base_url: String,
}

impl SmtpNotifier {
    pub fn from_config(config: &SmtpConfig) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .context("Invalid SMTP host")?
            .port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: config.from.clone(),
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl InviteNotifier for SmtpNotifier {
    async fn send_invite(
        &self,
        email: &str,
        organization: &Organization,
        invite_code: &str,
    ) -> Result<()> {
        let accept_url = format!("{}/invite/accept?code={}", self.base_url, invite_code);
        let body = format!(
            "You have been invited to join {} on Lattice.\n\n\
             Accept your invitation within 48 hours:\n{}\n",
            organization.name, accept_url
        );

        let message = Message::builder()
            .from(self.from.parse().context("Invalid from address")?)
            .to(email.parse().context("Invalid recipient address")?)
            .subject(format!("Invitation to join {}", organization.name))
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .context("Failed to build invite email")?;

        self.transport
            .send(message)
            .await
            .context("Failed to send invite email")?;

        info!(email = email, organization = %organization.slug, "Invite email sent");
        Ok(())
    }
}

/// Notifier used when SMTP is not configured. Logs the invite and reports
/// success so development setups behave like delivery worked.
pub struct NoopNotifier;

#[async_trait]
impl InviteNotifier for NoopNotifier {
    async fn send_invite(
        &self,
        email: &str,
        organization: &Organization,
        invite_code: &str,
    ) -> Result<()> {
        info!(
            email = email,
            organization = %organization.slug,
            invite_code = invite_code,
            "SMTP not configured, invite email not sent"
        );
        Ok(())
    }
}
