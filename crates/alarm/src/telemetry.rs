//! Logging setup.
//!
//! Installs one JSON `tracing` subscriber writing to stdout. `RUST_LOG`
//! wins when set; otherwise the configured application log level applies
//! to every target.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Level used when the configured one cannot be parsed.
const FALLBACK_LEVEL: LevelFilter = LevelFilter::INFO;

/// Initialise the global subscriber. Call once, at startup.
pub fn init(log_level: &str) {
    let parsed = parse_level(log_level);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(parsed.unwrap_or(FALLBACK_LEVEL).into())
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stdout),
        )
        .init();

    if parsed.is_none() {
        tracing::error!(
            level = log_level,
            "Unable to set log level from application settings, using info",
        );
    }
}

/// Parse a level name such as `info`, `DEBUG` or `warning`.
pub fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.trim().to_ascii_lowercase().as_str() {
        "" => None,
        "warning" => Some(LevelFilter::WARN),
        other => other.parse().ok(),
    }
}
