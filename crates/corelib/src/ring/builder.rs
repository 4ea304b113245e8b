//! Builder for ring snapshots outside a membership table (tools, tests,
//! benchmarks).

use crate::node::NodeId;
use crate::partitioner::{default_partitioner, SharedPartitioner};
use crate::ring::HashRing;

/// Builder pattern for [`HashRing`].
///
/// # Example
///
/// ```rust
/// use corelib::{NodeId, RingBuilder};
///
/// let ring = RingBuilder::new()
///     .with_vnodes(8)
///     .add_node(NodeId::parse("http://10.0.0.1:4000").unwrap())
///     .add_node(NodeId::parse("http://10.0.0.2:4000").unwrap())
///     .build();
/// assert_eq!(ring.token_count(), 16);
/// ```
pub struct RingBuilder {
    vnodes: usize,
    partitioner: SharedPartitioner,
    nodes: Vec<(NodeId, Option<usize>)>,
}

impl RingBuilder {
    /// One vnode per node, default partitioner.
    pub fn new() -> Self {
        Self {
            vnodes: 1,
            partitioner: default_partitioner(),
            nodes: Vec::new(),
        }
    }

    /// Default number of vnodes for nodes added without an explicit count.
    pub fn with_vnodes(mut self, vnodes: usize) -> Self {
        self.vnodes = vnodes.max(1);
        self
    }

    pub fn with_partitioner(mut self, partitioner: SharedPartitioner) -> Self {
        self.partitioner = partitioner;
        self
    }

    pub fn add_node(mut self, id: NodeId) -> Self {
        self.nodes.push((id, None));
        self
    }

    pub fn add_node_with_vnodes(mut self, id: NodeId, vnodes: usize) -> Self {
        self.nodes.push((id, Some(vnodes)));
        self
    }

    pub fn build(self) -> HashRing {
        let default = self.vnodes;
        HashRing::assemble(
            self.nodes
                .into_iter()
                .map(|(id, vnodes)| (id, vnodes.unwrap_or(default))),
            self.partitioner,
        )
    }
}

impl Default for RingBuilder {
    fn default() -> Self {
        Self::new()
    }
}
