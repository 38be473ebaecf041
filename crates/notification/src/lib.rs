//! Alert delivery for received subscription events.
//!
//! - [`Notifier`]: the capability the session hands every event to.
//! - [`EmailNotifier`]: SMTP delivery of a highlighted HTML rendering.
//! - [`render`]: JSON pretty-printing and syntax highlighting.

pub mod email;
pub mod notifier;
pub mod render;

pub use email::{EmailError, EmailNotifier, ALERT_SUBJECT};
pub use notifier::Notifier;
