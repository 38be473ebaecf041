use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::{file, secrets};

/// Default application name used in log output.
const DEFAULT_APP_NAME: &str = "fhir-alarm";

/// Default log level when `APP_LOG_LEVEL` is not set.
const DEFAULT_LOG_LEVEL: &str = "info";

/// Default WebSocket path of the FHIR subscription endpoint.
const DEFAULT_WS_PATH: &str = "/fhir/ws";

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Complete runtime configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub fhir: FhirSettings,
    pub email: EmailSettings,
}

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    /// Level directive such as `info` or `debug`. Validated when logging
    /// is initialised, not here.
    pub log_level: String,
}

/// Connection settings for the FHIR server's subscription WebSocket.
#[derive(Debug, Clone)]
pub struct FhirSettings {
    /// Host (and optional port) of the FHIR server, e.g. `dsf.example.org`.
    pub host: String,
    /// WebSocket path, defaults to `/fhir/ws`.
    pub path: String,
    /// Identifier of the pre-registered subscription to bind to.
    pub subscription_id: String,
    /// Client certificate for mutual TLS. `None` when not configured; the
    /// runner refuses to start without it.
    pub auth: Option<ClientAuth>,
    /// Extra PEM trust anchors added to the bundled web-PKI roots.
    pub ca_location: Option<PathBuf>,
}

/// Locations of the PEM-encoded client certificate chain and private key.
#[derive(Debug, Clone)]
pub struct ClientAuth {
    pub cert_location: PathBuf,
    pub key_location: PathBuf,
}

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub recipients: Vec<String>,
    /// RFC 5322 "From" address.
    pub sender: String,
    pub smtp: SmtpSettings,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl FhirSettings {
    /// Full `wss://` URL of the subscription endpoint.
    pub fn ws_url(&self) -> String {
        format!("wss://{}{}", self.host, self.path)
    }
}

impl Settings {
    /// Load configuration from `./app.yaml` (if present) overlaid with
    /// environment variables.
    ///
    /// Precedence, lowest first: the file, the environment, then a
    /// `<NAME>_FILE` secret file from either (see [`secrets::resolve`]).
    /// File keys map onto the variable names below, see [`file`].
    ///
    /// | Variable                           | Required  | Default      |
    /// |------------------------------------|-----------|--------------|
    /// | `APP_NAME`                         | no        | `fhir-alarm` |
    /// | `APP_LOG_LEVEL`                    | no        | `info`       |
    /// | `FHIR_SERVER_HOST`                 | yes       | -            |
    /// | `FHIR_SERVER_PATH`                 | no        | `/fhir/ws`   |
    /// | `FHIR_SERVER_SUBSCRIPTION_ID`      | yes       | -            |
    /// | `FHIR_SERVER_AUTH_CERT_LOCATION`   | with key  | -            |
    /// | `FHIR_SERVER_AUTH_KEY_LOCATION`    | with cert | -            |
    /// | `FHIR_SERVER_CA_LOCATION`          | no        | -            |
    /// | `NOTIFICATION_EMAIL_RECIPIENTS`    | yes       | -            |
    /// | `NOTIFICATION_EMAIL_SENDER`        | yes       | -            |
    /// | `NOTIFICATION_EMAIL_SMTP_SERVER`   | yes       | -            |
    /// | `NOTIFICATION_EMAIL_SMTP_PORT`     | no        | `587`        |
    /// | `NOTIFICATION_EMAIL_SMTP_USER`     | no        | -            |
    /// | `NOTIFICATION_EMAIL_SMTP_PASSWORD` | no        | -            |
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."))
    }

    /// Like [`load`](Self::load), reading `app.yaml` from `config_dir`.
    pub fn load_from(config_dir: &Path) -> Result<Self, ConfigError> {
        let values = file::load(&config_dir.join(file::CONFIG_FILE_NAME))?;
        Self::from_lookup(layered(|key| std::env::var(key).ok(), values))
    }

    /// Load configuration from an arbitrary key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| secrets::resolve(&lookup, key);
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let app = AppSettings {
            name: get("APP_NAME").unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            log_level: get("APP_LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        };

        let auth = match (
            get("FHIR_SERVER_AUTH_CERT_LOCATION"),
            get("FHIR_SERVER_AUTH_KEY_LOCATION"),
        ) {
            (Some(cert), Some(key)) => Some(ClientAuth {
                cert_location: cert.into(),
                key_location: key.into(),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("FHIR_SERVER_AUTH_KEY_LOCATION")),
            (None, Some(_)) => return Err(ConfigError::Missing("FHIR_SERVER_AUTH_CERT_LOCATION")),
        };

        let path = get("FHIR_SERVER_PATH").unwrap_or_else(|| DEFAULT_WS_PATH.to_string());
        if !path.starts_with('/') {
            return Err(ConfigError::Invalid {
                key: "FHIR_SERVER_PATH",
                reason: format!("'{path}' must start with '/'"),
            });
        }

        let fhir = FhirSettings {
            host: require("FHIR_SERVER_HOST")?,
            path,
            subscription_id: require("FHIR_SERVER_SUBSCRIPTION_ID")?,
            auth,
            ca_location: get("FHIR_SERVER_CA_LOCATION").map(PathBuf::from),
        };

        let recipients = parse_recipients(&require("NOTIFICATION_EMAIL_RECIPIENTS")?);
        if recipients.is_empty() {
            return Err(ConfigError::Invalid {
                key: "NOTIFICATION_EMAIL_RECIPIENTS",
                reason: "no recipient addresses given".into(),
            });
        }

        let port = match get("NOTIFICATION_EMAIL_SMTP_PORT") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                key: "NOTIFICATION_EMAIL_SMTP_PORT",
                reason: format!("'{raw}': {e}"),
            })?,
            None => DEFAULT_SMTP_PORT,
        };

        let email = EmailSettings {
            recipients,
            sender: require("NOTIFICATION_EMAIL_SENDER")?,
            smtp: SmtpSettings {
                server: require("NOTIFICATION_EMAIL_SMTP_SERVER")?,
                port,
                user: get("NOTIFICATION_EMAIL_SMTP_USER"),
                password: get("NOTIFICATION_EMAIL_SMTP_PASSWORD"),
            },
        };

        Ok(Self { app, fhir, email })
    }
}

/// Environment values over file values; empty variables do not mask the file.
fn layered<F>(env: F, from_file: HashMap<String, String>) -> impl Fn(&str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    move |key| {
        env(key)
            .filter(|v| !v.is_empty())
            .or_else(|| from_file.get(key).cloned())
    }
}

/// Split a comma-separated recipient list, dropping blank entries.
fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
