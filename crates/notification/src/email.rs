//! Email notification delivery via SMTP.
//!
//! [`EmailNotifier`] wraps the `lettre` async SMTP transport and sends one
//! HTML email per received event: the payload pretty-printed and
//! syntax-highlighted by [`render::highlight_json`]. STARTTLS is mandatory;
//! `AUTH LOGIN` is used when credentials are configured.

use async_trait::async_trait;
use fhir_alarm_core::EmailSettings;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::notifier::Notifier;
use crate::render::{self, RenderError};

/// Subject line of every alert email.
pub const ALERT_SUBJECT: &str = "💣 DSF Task failed";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email construction and delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The event payload could not be rendered.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailNotifier
// ---------------------------------------------------------------------------

/// Sends alert emails for subscription events via SMTP.
pub struct EmailNotifier {
    sender: Mailbox,
    recipients: Vec<Mailbox>,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl std::fmt::Debug for EmailNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailNotifier")
            .field("sender", &self.sender)
            .field("recipients", &self.recipients)
            .finish_non_exhaustive()
    }
}

impl EmailNotifier {
    /// Build the notifier and its SMTP transport.
    ///
    /// Fails if any address is malformed or the relay's TLS parameters
    /// cannot be set up. No connection is opened until the first
    /// delivery.
    pub fn new(settings: &EmailSettings) -> Result<Self, EmailError> {
        let sender: Mailbox = settings.sender.parse()?;
        let recipients = settings
            .recipients
            .iter()
            .map(|r| r.parse())
            .collect::<Result<Vec<Mailbox>, _>>()?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp.server)?
                .port(settings.smtp.port);

        if let (Some(user), Some(pass)) = (&settings.smtp.user, &settings.smtp.password) {
            transport_builder = transport_builder
                .credentials(Credentials::new(user.clone(), pass.clone()))
                .authentication(vec![Mechanism::Login]);
        }

        Ok(Self {
            sender,
            recipients,
            mailer: transport_builder.build(),
        })
    }

    /// Render `payload` and send it to every configured recipient.
    pub async fn deliver(&self, payload: &[u8]) -> Result<(), EmailError> {
        let body = render::highlight_json(payload)?;
        let email = self.build_message(body)?;

        self.mailer.send(email).await?;

        tracing::info!(
            recipients = self.recipients.len(),
            "E-Mail notification successfully delivered"
        );
        Ok(())
    }

    fn build_message(&self, body: String) -> Result<Message, EmailError> {
        let mut builder = Message::builder()
            .from(self.sender.clone())
            .subject(ALERT_SUBJECT)
            .header(ContentType::TEXT_HTML);

        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }

        builder
            .body(body)
            .map_err(|e| EmailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, payload: &[u8]) {
        if let Err(e) = self.deliver(payload).await {
            match e {
                EmailError::Render(_) => {
                    tracing::error!(error = %e, "Failed to parse JSON");
                }
                _ => tracing::error!(error = %e, "Failed to deliver E-Mail"),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
