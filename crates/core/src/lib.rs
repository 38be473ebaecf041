//! Shared configuration model for the FHIR subscription alarm.
//!
//! [`Settings`] is built once at startup from the process environment
//! and an optional `app.yaml` (see [`Settings::load`]) and handed to the runner, which never
//! mutates it afterwards.

pub mod config;
pub mod error;
pub mod file;
pub mod secrets;

pub use config::{AppSettings, ClientAuth, EmailSettings, FhirSettings, Settings, SmtpSettings};
pub use error::ConfigError;
