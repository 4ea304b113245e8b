//! Simple replication strategy.
//!
//! Places N copies sequentially around the ring (clockwise from the owner).
//!
//! # Algorithm
//!
//! 1. Find the owner (first token at or after the key's token)
//! 2. Continue clockwise collecting distinct nodes
//! 3. Stop at N nodes or when every node on the ring has been taken
//!
//! Dead nodes never appear because ring snapshots only contain alive nodes.
//!
//! # Performance
//!
//! - **Time**: O(log t + t) worst case where t = tokens on the ring
//! - **Space**: O(N)

use crate::strategy::ReplicationStrategy;
use corelib::{Error, HashRing, NodeId};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Simple replication strategy: N copies placed sequentially around the ring.
///
/// # Example
///
/// ```rust
/// use corelib::{NodeId, RingBuilder};
/// use replication::{ReplicationStrategy, SimpleStrategy};
///
/// let ring = RingBuilder::new()
///     .add_node(NodeId::parse("http://10.0.0.1:4000").unwrap())
///     .add_node(NodeId::parse("http://10.0.0.2:4000").unwrap())
///     .build();
///
/// let strategy = SimpleStrategy::new(3);
/// // Capped at the two nodes available.
/// assert_eq!(strategy.replicas_for_key(&ring, "my-key").unwrap().len(), 2);
/// ```
#[derive(Debug)]
pub struct SimpleStrategy {
    /// Number of copies to keep (including the owner).
    replication_factor: AtomicUsize,
}

impl SimpleStrategy {
    /// Create a strategy keeping `replication_factor` copies.
    ///
    /// A factor of 0 is raised to 1: a key always has an owner.
    pub fn new(replication_factor: usize) -> Self {
        Self {
            replication_factor: AtomicUsize::new(replication_factor.max(1)),
        }
    }
}

impl Default for SimpleStrategy {
    /// Owner only, no extra replicas.
    fn default() -> Self {
        Self::new(1)
    }
}

impl ReplicationStrategy for SimpleStrategy {
    fn replication_factor(&self) -> usize {
        self.replication_factor.load(Ordering::Acquire)
    }

    fn set_replication_factor(&self, factor: usize) -> corelib::Result<()> {
        if factor == 0 {
            return Err(Error::InvalidReplicationFactor(factor));
        }
        let previous = self.replication_factor.swap(factor, Ordering::AcqRel);
        if previous != factor {
            tracing::info!(previous, factor, "replication factor changed");
        }
        Ok(())
    }

    fn replicas_with_factor(
        &self,
        ring: &HashRing,
        key: &str,
        factor: usize,
    ) -> corelib::Result<Vec<NodeId>> {
        ring.preference_list(key, factor)
    }

    fn name(&self) -> &'static str {
        "SimpleStrategy"
    }
}
