//! WebSocket read loop.
//!
//! Receives frames from the subscription connection one at a time and
//! hands every event payload to the notifier before receiving the next.

use std::sync::Arc;

use fhir_alarm_notification::Notifier;
use futures::{Stream, StreamExt};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_util::sync::CancellationToken;

use crate::session::CLOSE_DRAIN_TIMEOUT;

/// Process frames until the server closes the stream or a receive fails.
///
/// `done` is cancelled when this function returns (or unwinds), which is
/// how the coordinating task learns that the reader has ended.
pub(crate) async fn read_messages<S>(
    mut stream: S,
    notifier: Arc<dyn Notifier>,
    done: CancellationToken,
) where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    let _done = done.drop_guard();

    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                handle_message(text.as_bytes(), notifier.as_ref()).await;
            }
            Ok(Message::Binary(data)) => {
                handle_message(&data, notifier.as_ref()).await;
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                // Handled automatically by tungstenite.
            }
            Ok(Message::Close(frame)) => {
                tracing::info!(?frame, "FHIR server closed WebSocket");
                drain_after_close(&mut stream).await;
                return;
            }
            Ok(Message::Frame(_)) => {}
            Err(e) => {
                tracing::error!(error = %e, "Failed to read message");
                return;
            }
        }
    }

    tracing::info!("WebSocket stream exhausted");
}

/// Keep polling after a remote close so the transport flushes its close
/// reply. Frames still in flight are discarded; the server ends the
/// stream once the reply arrives.
async fn drain_after_close<S>(stream: &mut S)
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    let drained = tokio::time::timeout(CLOSE_DRAIN_TIMEOUT, async {
        while let Some(Ok(_)) = stream.next().await {}
    })
    .await;

    if drained.is_err() {
        tracing::debug!(
            timeout_ms = CLOSE_DRAIN_TIMEOUT.as_millis() as u64,
            "Server did not end the stream after close",
        );
    }
}

/// Log one event and pass it to the notifier verbatim.
async fn handle_message(payload: &[u8], notifier: &dyn Notifier) {
    tracing::info!(msg = %String::from_utf8_lossy(payload), "Message received");
    notifier.send(payload).await;
}
