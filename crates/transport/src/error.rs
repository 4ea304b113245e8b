//! Error types for the HTTP layer.

/// Failure to set up the client or run the server. Failed peer calls are
/// reported as [`replication::TransportError`] instead.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("http client setup failed: {0}")]
    Client(#[from] reqwest::Error),

    #[error("server i/o failed: {0}")]
    Io(#[from] std::io::Error),
}
