use std::time::Duration;

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::sharing::{Mailer, OutgoingEmail};

#[derive(Debug, thiserror::Error)]
pub enum SmtpMailerError {
    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// SMTP password. `Debug` never prints the secret.
#[derive(Clone)]
pub struct SmtpPassword(String);

impl SmtpPassword {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }
}

impl std::fmt::Debug for SmtpPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SmtpPassword(****)")
    }
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub const DEFAULT_PORT: u16 = 587;

    /// Authenticated relay using STARTTLS, e.g. `smtp.gmail.com:587`
    pub fn starttls(
        host: &str,
        port: u16,
        username: impl Into<String>,
        password: SmtpPassword,
        timeout: Duration,
    ) -> Result<Self, SmtpMailerError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .port(port)
            .credentials(Credentials::new(username.into(), password.0))
            .timeout(Some(timeout))
            .build();

        Ok(Self { transport })
    }

    /// Plain connection without TLS or auth, for local relays such as mailpit
    pub fn unencrypted(host: &str, port: u16) -> Self {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .build();

        Self { transport }
    }
}

impl Mailer for SmtpMailer {
    type Error = SmtpMailerError;

    async fn send(&self, email: OutgoingEmail) -> Result<(), Self::Error> {
        let message = Message::builder()
            .from(email.from)
            .to(Mailbox::new(None, email.to))
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)?;

        self.transport
            .send(message)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to send email"))?;

        Ok(())
    }
}
