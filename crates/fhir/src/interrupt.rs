//! Operator interrupt notifications.
//!
//! An interrupt is advisory and may arrive any number of times. Each one
//! is delivered to the session as a `()` on an unbounded channel; the
//! session decides what a repeat means.

use tokio::sync::mpsc;

/// Where a session's interrupt notifications come from.
#[derive(Debug)]
pub enum InterruptSource {
    /// SIGINT (Ctrl-C) and, on Unix, SIGTERM. Handlers are installed
    /// only when the session starts listening, after the dial.
    Signals,
    /// Notifications sent through an [`InterruptHandle`].
    Channel(mpsc::UnboundedReceiver<()>),
}

/// Sending side of [`InterruptSource::Channel`].
#[derive(Debug, Clone)]
pub struct InterruptHandle(mpsc::UnboundedSender<()>);

impl InterruptHandle {
    /// Deliver one interrupt. Returns `false` once the session has ended.
    pub fn interrupt(&self) -> bool {
        self.0.send(()).is_ok()
    }
}

impl InterruptSource {
    /// A manually triggered source and its handle.
    pub fn channel() -> (InterruptHandle, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (InterruptHandle(tx), Self::Channel(rx))
    }

    /// Start listening and return the notification receiver.
    pub(crate) fn listen(self) -> mpsc::UnboundedReceiver<()> {
        match self {
            Self::Channel(rx) => rx,
            Self::Signals => {
                let (tx, rx) = mpsc::unbounded_channel();
                tokio::spawn(forward_signals(tx));
                rx
            }
        }
    }
}

/// Forward process signals until the receiving session goes away.
async fn forward_signals(tx: mpsc::UnboundedSender<()>) {
    let mut terminate = install_terminate();

    loop {
        let signal = tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => "SIGINT",
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install Ctrl-C handler");
                    return;
                }
            },
            () = terminated(&mut terminate) => "SIGTERM",
            () = tx.closed() => return,
        };

        tracing::debug!(signal, "Signal received");
        if tx.send(()).is_err() {
            return;
        }
    }
}

#[cfg(unix)]
type Terminate = Option<tokio::signal::unix::Signal>;

#[cfg(not(unix))]
type Terminate = ();

#[cfg(unix)]
fn install_terminate() -> Terminate {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGTERM handler");
            None
        }
    }
}

#[cfg(not(unix))]
fn install_terminate() -> Terminate {}

#[cfg(unix)]
async fn terminated(terminate: &mut Terminate) {
    if let Some(s) = terminate {
        if s.recv().await.is_some() {
            return;
        }
    }
    std::future::pending().await
}

#[cfg(not(unix))]
async fn terminated(_terminate: &mut Terminate) {
    std::future::pending().await
}
