//! Dialing the FHIR subscription endpoint.
//!
//! [`Connector`] is the seam between the [`Session`](crate::Session) and
//! the network: it produces a framed, bidirectional WebSocket transport.
//! [`TlsConnector`] is the production implementation, presenting a
//! client certificate over `wss://`.

use std::sync::Arc;

use async_trait::async_trait;
use fhir_alarm_core::{ClientAuth, FhirSettings};
use futures::{Sink, Stream};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async_tls_with_config, MaybeTlsStream, WebSocketStream};

use crate::error::SessionError;
use crate::tls::{self, CredentialError};

/// Produces a live WebSocket transport for one session.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Framed transport: received messages as a stream, sent messages
    /// through a sink.
    type Transport: Stream<Item = Result<Message, WsError>>
        + Sink<Message, Error = WsError>
        + Send
        + Unpin
        + 'static;

    /// Human-readable target address, used in log output.
    fn target(&self) -> &str;

    /// Dial the target. No retry is attempted.
    async fn connect(&self) -> Result<Self::Transport, SessionError>;
}

/// Connects to a `wss://` endpoint with client-certificate authentication.
#[derive(Debug)]
pub struct TlsConnector {
    url: String,
    tls: Arc<rustls::ClientConfig>,
}

impl TlsConnector {
    pub fn new(url: String, tls: Arc<rustls::ClientConfig>) -> Self {
        Self { url, tls }
    }

    /// Load the client credential and target URL from settings.
    pub fn from_settings(fhir: &FhirSettings, auth: &ClientAuth) -> Result<Self, CredentialError> {
        let tls = tls::client_config(auth, fhir.ca_location.as_deref())?;
        Ok(Self::new(fhir.ws_url(), tls))
    }
}

#[async_trait]
impl Connector for TlsConnector {
    type Transport = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

    fn target(&self) -> &str {
        &self.url
    }

    async fn connect(&self) -> Result<Self::Transport, SessionError> {
        let connector = tokio_tungstenite::Connector::Rustls(Arc::clone(&self.tls));

        let (ws_stream, _response) =
            connect_async_tls_with_config(self.url.as_str(), None, false, Some(connector))
                .await
                .map_err(|e| {
                    SessionError::Connection(format!("Failed to connect to {}: {e}", self.url))
                })?;

        tracing::info!(url = %self.url, "Connected to FHIR subscription endpoint");
        Ok(ws_stream)
    }
}
