use async_trait::async_trait;

/// Best-effort delivery of one raw event payload to a human.
///
/// `send` has no error channel: implementations log their own failures.
/// The read loop awaits every call before receiving the next frame, so a
/// failing notifier must return rather than retry indefinitely.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, payload: &[u8]);
}
