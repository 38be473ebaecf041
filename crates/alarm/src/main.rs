//! `fhir-alarm` -- e-mail alerts for FHIR subscription events.
//!
//! Connects to a FHIR server's subscription WebSocket with a client
//! certificate, binds to one subscription and mails every event it
//! receives. Stops on Ctrl-C / SIGTERM or when the server hangs up.
//!
//! Configuration is read from `app.yaml`, the environment and `.env`;
//! see [`Settings::load`] for the full variable table.
//!
//! Exit code 0 after a clean shutdown, 1 on any startup or connect
//! failure.

use std::process::ExitCode;

use fhir_alarm::{runner, telemetry};
use fhir_alarm_core::Settings;

/// Log level used until settings are available.
const BOOTSTRAP_LOG_LEVEL: &str = "info";

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            telemetry::init(BOOTSTRAP_LOG_LEVEL);
            tracing::error!(error = %e, "Unable to load configuration");
            return ExitCode::FAILURE;
        }
    };

    telemetry::init(&settings.app.log_level);

    tracing::info!(
        app = %settings.app.name,
        url = %settings.fhir.ws_url(),
        subscription_id = %settings.fhir.subscription_id,
        "Starting fhir-alarm",
    );

    let session = match runner::build_session(&settings) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    runner::run(session).await
}
