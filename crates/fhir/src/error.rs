/// Errors surfaced by [`Session::connect_and_bind`](crate::Session::connect_and_bind).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Failed to establish the TLS WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),
}
