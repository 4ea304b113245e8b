//! Error types for replication and peer communication.

use corelib::NodeId;

/// A failed call to a peer. Every variant counts as a failed communication
/// and marks the peer dead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection refused, reset or timed out.
    #[error("peer {peer} unreachable: {reason}")]
    Unreachable { peer: NodeId, reason: String },

    /// The peer answered with a non-success status.
    #[error("peer {peer} answered with status {status}")]
    Status { peer: NodeId, status: u16 },

    /// The peer answered with a body we could not decode.
    #[error("invalid response from peer {peer}: {reason}")]
    Decode { peer: NodeId, reason: String },
}

impl TransportError {
    pub fn peer(&self) -> &NodeId {
        match self {
            TransportError::Unreachable { peer, .. }
            | TransportError::Status { peer, .. }
            | TransportError::Decode { peer, .. } => peer,
        }
    }
}

/// Errors surfaced to callers of the replication engine.
///
/// Peer failures are absorbed (the peer is marked dead and the operation
/// continues), so only ring-level failures reach the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplicationError {
    #[error(transparent)]
    Ring(#[from] corelib::Error),
}
