//! FHIR subscription WebSocket client.
//!
//! Provides mutual-TLS credential loading, the [`Connector`] seam used to
//! dial the subscription endpoint, and the single-use [`Session`] that
//! binds to a subscription, forwards every received event to a
//! [`Notifier`](fhir_alarm_notification::Notifier) and runs the close
//! handshake on interrupt or remote hang-up.

pub mod connector;
pub mod error;
pub mod interrupt;
mod reader;
pub mod session;
pub mod tls;

pub use connector::{Connector, TlsConnector};
pub use error::SessionError;
pub use interrupt::{InterruptHandle, InterruptSource};
pub use session::{Session, CLOSE_DRAIN_TIMEOUT};
pub use tls::CredentialError;
