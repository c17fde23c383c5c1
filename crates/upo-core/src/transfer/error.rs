//! Transfer error type.

/// Error returned by a [`TransferClient`](super::TransferClient).
///
/// The orchestrator never propagates these; it stores the display text on the
/// failed task.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Curl reported an error (timeout, connection, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// Building the multipart body failed.
    #[error("multipart form: {0}")]
    Form(#[from] curl::FormError),
    /// HTTP response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// The source payload could not be read.
    #[error("source: {0}")]
    Source(#[from] std::io::Error),
    /// The server answered 2xx but the body did not name the stored file.
    #[error("unexpected response: {0}")]
    Response(String),
    /// Anything else a transport wants to report; may be empty.
    #[error("{0}")]
    Other(String),
}

impl TransferError {
    pub fn other(message: impl Into<String>) -> Self {
        TransferError::Other(message.into())
    }
}
