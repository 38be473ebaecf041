//! Subscription session lifecycle.
//!
//! A [`Session`] dials the FHIR server, binds to one subscription, runs a
//! background reader that forwards events to the notifier, and waits for
//! either the reader to end or an operator interrupt. Both paths run the
//! close handshake; the connection is released exactly once.
//!
//! ```text
//! Unconnected -> Connecting -> Bound -> Reading -> Closing -> Closed
//!                     |                                          ^
//!                     +------------- dial failure ---------------+
//! ```

use std::sync::Arc;
use std::time::Duration;

use fhir_alarm_notification::Notifier;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_util::sync::CancellationToken;

use crate::connector::Connector;
use crate::error::SessionError;
use crate::interrupt::InterruptSource;
use crate::reader::read_messages;

/// How long the close handshake waits for the server to end the stream.
pub const CLOSE_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// One subscription's connection for one process run.
///
/// Construction performs no I/O. [`connect_and_bind`](Self::connect_and_bind)
/// consumes the session, so it cannot be reused.
pub struct Session<C> {
    connector: C,
    subscription_id: String,
    notifier: Arc<dyn Notifier>,
    interrupts: InterruptSource,
}

impl<C: std::fmt::Debug> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("connector", &self.connector)
            .field("subscription_id", &self.subscription_id)
            .field("interrupts", &self.interrupts)
            .finish_non_exhaustive()
    }
}

impl<C: Connector> Session<C> {
    /// Create a session listening for process signals as interrupts.
    pub fn new(connector: C, subscription_id: impl Into<String>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            connector,
            subscription_id: subscription_id.into(),
            notifier,
            interrupts: InterruptSource::Signals,
        }
    }

    /// Replace the interrupt source.
    pub fn with_interrupts(mut self, interrupts: InterruptSource) -> Self {
        self.interrupts = interrupts;
        self
    }

    /// Identifier sent in the `bind` command.
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Connect, bind to the subscription and forward events until the
    /// stream ends.
    ///
    /// Returns `Err` only if the dial fails. Once connected, bind and
    /// close failures are logged and the session proceeds to shutdown;
    /// the call returns `Ok(())` after the reader has ended, whether the
    /// server hung up or an interrupt triggered the close handshake.
    pub async fn connect_and_bind(self) -> Result<(), SessionError> {
        let Self {
            connector,
            subscription_id,
            notifier,
            interrupts,
        } = self;

        tracing::info!(url = connector.target(), "Connecting to websocket");
        let transport = connector.connect().await.inspect_err(|e| {
            tracing::error!(url = connector.target(), error = %e, "Failed to connect to websocket");
        })?;

        let mut interrupts = interrupts.listen();
        let mut conn = Connection::open(transport, notifier);

        if let Err(e) = conn.bind(&subscription_id).await {
            tracing::error!(
                subscription_id = %subscription_id,
                url = connector.target(),
                error = %e,
                "Failed to bind to subscription",
            );
            conn.close().await;
        }

        let reader_done = conn.done.clone();
        loop {
            tokio::select! {
                biased;
                () = reader_done.cancelled() => break,
                Some(()) = interrupts.recv() => {
                    tracing::info!("Interrupt received. Sending close message...");
                    conn.close().await;
                }
            }
        }

        conn.release().await;
        tracing::info!(subscription_id = %subscription_id, "Session closed");
        Ok(())
    }
}

/// The live connection: write half owned by the coordinating task, read
/// half owned by the reader task.
struct Connection<T> {
    sink: SplitSink<T, Message>,
    reader: Option<JoinHandle<()>>,
    done: CancellationToken,
}

impl<T> Connection<T>
where
    T: futures::Stream<Item = Result<Message, WsError>>
        + futures::Sink<Message, Error = WsError>
        + Send
        + Unpin
        + 'static,
{
    fn open(transport: T, notifier: Arc<dyn Notifier>) -> Self {
        let (sink, stream) = transport.split();
        let done = CancellationToken::new();
        let reader = tokio::spawn(read_messages(stream, notifier, done.clone()));

        Self {
            sink,
            reader: Some(reader),
            done,
        }
    }

    async fn bind(&mut self, subscription_id: &str) -> Result<(), WsError> {
        tracing::info!(subscription_id, "Bind to subscription");
        self.sink
            .send(Message::Text(format!("bind {subscription_id}")))
            .await
    }

    /// Send a normal-closure frame and give the server a bounded window
    /// to acknowledge it by ending the stream.
    async fn close(&mut self) {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        };
        if let Err(e) = self.sink.send(Message::Close(Some(frame))).await {
            tracing::error!(error = %e, "Failed to write close message to websocket");
            return;
        }

        if tokio::time::timeout(CLOSE_DRAIN_TIMEOUT, self.done.cancelled())
            .await
            .is_err()
        {
            tracing::debug!(
                timeout_ms = CLOSE_DRAIN_TIMEOUT.as_millis() as u64,
                "Server did not acknowledge close in time",
            );
        }
    }

    /// Stop the reader (a no-op if it already ended) and drop both halves
    /// of the transport.
    async fn release(mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
            let _ = reader.await;
        }
    }
}

impl<T> Drop for Connection<T> {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}
