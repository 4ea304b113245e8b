//! Virtual node abstractions.
//!
//! # Virtual Nodes (VNodes) Concept
//!
//! Each physical node may own several positions on the ring. With a single
//! position per node (the default) a node sits exactly at `hash(address)`;
//! extra positions smooth out the key distribution in small clusters:
//!
//! 1. **Better Load Distribution**: More tokens = smoother distribution of keys
//! 2. **Gradual Rebalancing**: When nodes join/leave, only a fraction of keys move
//!
//! # Performance Characteristics
//!
//! - **Memory**: O(v) where v = number of vnodes per node
//! - **Lookup**: O(log n) where n = total vnodes

use crate::node::NodeId;
use crate::partitioner::Partitioner;
use crate::token::{HashToken, Token};

/// A virtual node on the hash ring.
///
/// Represents a single token position owned by a physical node.
///
/// # Invariants
///
/// - Every `VirtualNode` belongs to exactly one physical node
/// - Ordering is by token first and node address second, so two nodes that
///   hash to the same position still sort the same way on every process
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualNode {
    /// Token position on the ring.
    pub token: HashToken,

    /// The physical node that owns this virtual node.
    pub node_id: NodeId,
}

impl VirtualNode {
    /// Create a new virtual node.
    #[inline]
    pub fn new(token: HashToken, node_id: NodeId) -> Self {
        Self { token, node_id }
    }

    /// Create a virtual node from a node ID and vnode index.
    ///
    /// # Algorithm
    ///
    /// - Index 0 hashes the bare address, the node's canonical position.
    /// - Index `i > 0` hashes `"address#i"`.
    ///
    /// # Example
    /// ```rust
    /// use corelib::{NodeId, SipPartitioner, VirtualNode};
    ///
    /// let id = NodeId::parse("http://10.0.0.1:4000").unwrap();
    /// let vnode0 = VirtualNode::from_index(id.clone(), 0, &SipPartitioner);
    /// let vnode1 = VirtualNode::from_index(id, 1, &SipPartitioner);
    /// assert_ne!(vnode0.token(), vnode1.token());
    /// ```
    pub fn from_index<P>(node_id: NodeId, vnode_index: usize, partitioner: &P) -> Self
    where
        P: Partitioner<TokenType = HashToken> + ?Sized,
    {
        let token = if vnode_index == 0 {
            partitioner.partition(node_id.as_str().as_bytes())
        } else {
            let vnode_key = format!("{}#{}", node_id, vnode_index);
            partitioner.partition(vnode_key.as_bytes())
        };

        Self::new(token, node_id)
    }

    /// Get the token position.
    #[inline]
    pub fn token(&self) -> HashToken {
        self.token
    }

    /// Get the owning node ID.
    #[inline]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Calculate the clockwise distance to another virtual node.
    #[inline]
    pub fn distance_to(&self, other: &Self) -> HashToken {
        self.token.distance_to(&other.token)
    }
}

impl std::fmt::Display for VirtualNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VNode(token={}, node={})", self.token, self.node_id)
    }
}
