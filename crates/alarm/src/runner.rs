//! Startup sequencing and the single session run.
//!
//! [`build_session`] turns validated [`Settings`] into a ready
//! [`Session`]; every failure on the way is fatal. [`run`] drives the
//! session once and maps its outcome to a process exit code.

use std::process::ExitCode;
use std::sync::Arc;

use fhir_alarm_core::{ConfigError, Settings};
use fhir_alarm_fhir::{Connector, CredentialError, Session, TlsConnector};
use fhir_alarm_notification::{EmailError, EmailNotifier};

/// Errors that abort the process before a session is started.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Unable to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(
        "No client certificate configured \
         (FHIR_SERVER_AUTH_CERT_LOCATION / FHIR_SERVER_AUTH_KEY_LOCATION)"
    )]
    MissingClientAuth,

    #[error("Failed to load certificates: {0}")]
    Credential(#[from] CredentialError),

    #[error("Failed to create e-mail client: {0}")]
    Notifier(#[from] EmailError),
}

/// Load the client credential and build the notifier and session.
///
/// Performs no network I/O.
pub fn build_session(settings: &Settings) -> Result<Session<TlsConnector>, StartupError> {
    let auth = settings
        .fhir
        .auth
        .as_ref()
        .ok_or(StartupError::MissingClientAuth)?;

    let connector = TlsConnector::from_settings(&settings.fhir, auth)?;
    let notifier = EmailNotifier::new(&settings.email)?;

    tracing::debug!(
        recipients = settings.email.recipients.len(),
        smtp_server = %settings.email.smtp.server,
        "E-mail notifier ready",
    );

    Ok(Session::new(
        connector,
        settings.fhir.subscription_id.clone(),
        Arc::new(notifier),
    ))
}

/// Run one session to completion.
///
/// Exit code 0 once the session has shut down cleanly, 1 if it could
/// not connect.
pub async fn run<C: Connector>(session: Session<C>) -> ExitCode {
    let subscription_id = session.subscription_id().to_string();

    match session.connect_and_bind().await {
        Ok(()) => {
            tracing::info!(subscription_id = %subscription_id, "Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(subscription_id = %subscription_id, error = %e, "Session failed");
            ExitCode::FAILURE
        }
    }
}
