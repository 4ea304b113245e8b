//! Error types for the core library.

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The ring has no alive node to route to.
    #[error("no nodes available")]
    NoAliveNodes,

    /// Invalid node address.
    #[error("invalid node: {0}")]
    InvalidNode(String),

    /// Replication factor outside the accepted range.
    #[error("invalid replication factor {0}: must be at least 1")]
    InvalidReplicationFactor(usize),

    /// Invalid token value or unknown partitioner name.
    #[error("invalid token: {0}")]
    InvalidToken(String),
}
