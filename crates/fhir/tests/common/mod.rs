//! In-memory WebSocket server double for session tests.
//!
//! [`FakeConnector`] hands out a [`FakeTransport`] that behaves like a
//! subscription endpoint: scripted events are released only after the
//! `bind` command arrives, close frames can be echoed, and the test can
//! hang up at any time through an [`Endpoint`].
//!
//! Close handling follows tungstenite: only the first outbound close
//! frame goes on the wire (later ones just flush), and the stream ends
//! once a close frame from the server has been delivered.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use async_trait::async_trait;
use fhir_alarm_fhir::{Connector, SessionError};
use fhir_alarm_notification::Notifier;
use futures::{Sink, Stream};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

// ---------------------------------------------------------------------------
// Server behaviour
// ---------------------------------------------------------------------------

/// How the fake endpoint reacts to the session.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Frames delivered once the bind command has been received.
    pub events: Vec<Message>,
    /// End the stream after the scripted events (remote hang-up).
    pub hang_up_after_events: bool,
    /// Reject the bind frame with a send error.
    pub fail_bind: bool,
    /// Reject close frames with a send error.
    pub fail_close: bool,
    /// Answer a close frame with a close frame of its own.
    pub echo_close: bool,
}

#[derive(Default)]
struct State {
    script: Script,
    incoming: VecDeque<Message>,
    ended: bool,
    close_sent: bool,
    close_received: bool,
    waker: Option<Waker>,
    sent: Vec<Message>,
    dials: usize,
    releases: usize,
}

impl State {
    fn wake(&mut self) {
        if let Some(waker) = self.waker.take() {
            waker.wake();
        }
    }
}

/// Test-side view of the fake endpoint.
#[derive(Clone, Default)]
pub struct Endpoint(Arc<Mutex<State>>);

impl Endpoint {
    /// Frames the session has sent, in order.
    pub fn sent(&self) -> Vec<Message> {
        self.0.lock().unwrap().sent.clone()
    }

    pub fn close_frames_sent(&self) -> usize {
        self.sent()
            .iter()
            .filter(|m| matches!(m, Message::Close(_)))
            .count()
    }

    pub fn dials(&self) -> usize {
        self.0.lock().unwrap().dials
    }

    /// Number of times the transport has been dropped.
    pub fn releases(&self) -> usize {
        self.0.lock().unwrap().releases
    }

    /// Deliver a frame right away, bound or not.
    pub fn push(&self, msg: Message) {
        let mut state = self.0.lock().unwrap();
        state.incoming.push_back(msg);
        state.wake();
    }

    /// End the stream as if the server dropped the connection.
    pub fn hang_up(&self) {
        let mut state = self.0.lock().unwrap();
        state.ended = true;
        state.wake();
    }
}

// ---------------------------------------------------------------------------
// Connector / transport
// ---------------------------------------------------------------------------

pub struct FakeConnector {
    endpoint: Endpoint,
    fail_dial: bool,
}

impl FakeConnector {
    pub fn new(script: Script) -> (Self, Endpoint) {
        let endpoint = Endpoint::default();
        endpoint.0.lock().unwrap().script = script;
        (
            Self {
                endpoint: endpoint.clone(),
                fail_dial: false,
            },
            endpoint,
        )
    }

    pub fn unreachable() -> (Self, Endpoint) {
        let (mut connector, endpoint) = Self::new(Script::default());
        connector.fail_dial = true;
        (connector, endpoint)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Transport = FakeTransport;

    fn target(&self) -> &str {
        "wss://fake.test/fhir/ws"
    }

    async fn connect(&self) -> Result<FakeTransport, SessionError> {
        self.endpoint.0.lock().unwrap().dials += 1;
        if self.fail_dial {
            return Err(SessionError::Connection("connection refused".into()));
        }
        Ok(FakeTransport(self.endpoint.0.clone()))
    }
}

pub struct FakeTransport(Arc<Mutex<State>>);

impl Drop for FakeTransport {
    fn drop(&mut self) {
        self.0.lock().unwrap().releases += 1;
    }
}

impl Stream for FakeTransport {
    type Item = Result<Message, WsError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut state = self.0.lock().unwrap();
        if state.close_received {
            return Poll::Ready(None);
        }
        if let Some(msg) = state.incoming.pop_front() {
            if matches!(msg, Message::Close(_)) {
                state.close_received = true;
            }
            return Poll::Ready(Some(Ok(msg)));
        }
        if state.ended {
            return Poll::Ready(Some(Err(WsError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server hung up",
            )))));
        }
        state.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl Sink<Message> for FakeTransport {
    type Error = WsError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, msg: Message) -> Result<(), WsError> {
        let mut state = self.0.lock().unwrap();
        let broken = || WsError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));

        match &msg {
            Message::Text(text) if text.starts_with("bind ") => {
                if state.script.fail_bind {
                    return Err(broken());
                }
                state.sent.push(msg.clone());
                let events = std::mem::take(&mut state.script.events);
                state.incoming.extend(events);
                if state.script.hang_up_after_events {
                    state.ended = true;
                }
            }
            Message::Close(_) => {
                if state.script.fail_close {
                    return Err(broken());
                }
                if state.close_sent {
                    return Ok(());
                }
                state.close_sent = true;
                state.sent.push(msg.clone());
                if state.script.echo_close {
                    state.incoming.push_back(Message::Close(None));
                }
            }
            _ => state.sent.push(msg.clone()),
        }

        state.wake();
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        Poll::Ready(Ok(()))
    }
}

// ---------------------------------------------------------------------------
// Notifiers
// ---------------------------------------------------------------------------

/// Records every payload it is handed.
#[derive(Default)]
pub struct RecordingNotifier {
    payloads: Mutex<Vec<Vec<u8>>>,
}

impl RecordingNotifier {
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, payload: &[u8]) {
        self.payloads.lock().unwrap().push(payload.to_vec());
    }
}

/// Counts calls, then hands the payload to the wrapped notifier.
pub struct CountingNotifier<N> {
    inner: N,
    calls: AtomicUsize,
}

impl<N> CountingNotifier<N> {
    pub fn new(inner: N) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<N: Notifier> Notifier for CountingNotifier<N> {
    async fn send(&self, payload: &[u8]) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.send(payload).await;
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Poll `cond` until it holds, failing the test after five seconds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
