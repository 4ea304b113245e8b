//! The seam between the replication engine and the network.

pub mod memory;

pub use memory::MemoryTransport;

use crate::error::TransportError;
use crate::version::Versioned;
use async_trait::async_trait;
use corelib::NodeId;

/// Calls one node makes on another.
///
/// Every error is treated the same way by the engine: the peer is marked
/// dead. Implementations should bound each call with a timeout.
#[async_trait]
pub trait PeerTransport: Send + Sync + 'static {
    /// Store `entry` under `key` on `peer` unless the peer holds a later
    /// copy. Succeeds either way.
    async fn replicate(&self, peer: &NodeId, key: &str, entry: &Versioned)
        -> Result<(), TransportError>;

    /// Ask `peer` to coordinate a write it may not hold itself. The peer does
    /// not forward it again, and keeps the version the write was given.
    async fn forward_write(&self, peer: &NodeId, key: &str, entry: &Versioned)
        -> Result<(), TransportError>;

    /// Read `key` from `peer`'s local store only.
    async fn fetch(&self, peer: &NodeId, key: &str) -> Result<Option<String>, TransportError>;

    /// Send our alive members to `peer` and receive its alive members.
    async fn exchange(
        &self,
        peer: &NodeId,
        from: &NodeId,
        known: &[NodeId],
    ) -> Result<Vec<NodeId>, TransportError>;
}
