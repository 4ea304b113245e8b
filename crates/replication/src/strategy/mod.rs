//! Replication strategy abstractions.
//!
//! A replication strategy decides how many copies of a key exist and which
//! nodes of a ring snapshot hold them.
//!
//! - **SimpleStrategy**: owner plus successors clockwise around the ring

pub mod simple;

pub use simple::SimpleStrategy;

use corelib::{HashRing, NodeId};

/// Trait for replication strategies.
///
/// # Thread Safety
///
/// Implementations must be thread-safe (Send + Sync) as one instance is
/// shared by every request handler of a node. The replication factor is
/// mutable at runtime, so implementations keep it behind interior
/// mutability.
pub trait ReplicationStrategy: Send + Sync + 'static {
    /// Number of copies of each key, owner included.
    fn replication_factor(&self) -> usize;

    /// Changes the replication factor. Already stored keys are only affected
    /// by the next reconciliation.
    fn set_replication_factor(&self, factor: usize) -> corelib::Result<()>;

    /// Nodes that should hold `key` when keeping `factor` copies, owner
    /// first.
    ///
    /// Fails with [`corelib::Error::NoAliveNodes`] on an empty ring.
    fn replicas_with_factor(
        &self,
        ring: &HashRing,
        key: &str,
        factor: usize,
    ) -> corelib::Result<Vec<NodeId>>;

    /// Nodes that should hold `key` under the current replication factor.
    fn replicas_for_key(&self, ring: &HashRing, key: &str) -> corelib::Result<Vec<NodeId>> {
        self.replicas_with_factor(ring, key, self.replication_factor())
    }

    /// Strategy name (for logging/debugging).
    fn name(&self) -> &'static str;
}
