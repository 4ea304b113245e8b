//! Hash ring snapshot: ordered virtual nodes plus owner and preference-list
//! lookups.

use crate::error::{Error, Result};
use crate::node::NodeId;
use crate::partitioner::{default_partitioner, SharedPartitioner};
use crate::token::HashToken;
use crate::vnode::VirtualNode;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Immutable ring of alive nodes.
///
/// # Invariants
///
/// - `vnodes` is sorted by `(token, node address)`, a total order that every
///   process computes identically for the same node set
/// - `nodes` holds exactly the physical owners of `vnodes`
#[derive(Clone)]
pub struct HashRing {
    vnodes: Vec<VirtualNode>,
    nodes: BTreeSet<NodeId>,
    partitioner: SharedPartitioner,
}

impl HashRing {
    /// An empty ring using the default partitioner.
    pub fn new() -> Self {
        Self::with_partitioner(default_partitioner())
    }

    /// An empty ring using `partitioner`.
    pub fn with_partitioner(partitioner: SharedPartitioner) -> Self {
        Self {
            vnodes: Vec::new(),
            nodes: BTreeSet::new(),
            partitioner,
        }
    }

    /// Builds a ring in which every node owns `vnodes_per_node` positions.
    ///
    /// Duplicate node ids are collapsed. A `vnodes_per_node` of zero is
    /// treated as one so a listed node is never silently absent.
    pub fn from_nodes<I>(nodes: I, vnodes_per_node: usize, partitioner: SharedPartitioner) -> Self
    where
        I: IntoIterator<Item = NodeId>,
    {
        Self::assemble(
            nodes.into_iter().map(|id| (id, vnodes_per_node)),
            partitioner,
        )
    }

    pub(crate) fn assemble<I>(entries: I, partitioner: SharedPartitioner) -> Self
    where
        I: IntoIterator<Item = (NodeId, usize)>,
    {
        let mut ring = Self::with_partitioner(partitioner);
        for (id, count) in entries {
            if !ring.nodes.insert(id.clone()) {
                continue;
            }
            for index in 0..count.max(1) {
                ring.vnodes
                    .push(VirtualNode::from_index(id.clone(), index, ring.partitioner.as_ref()));
            }
        }
        ring.vnodes.sort_unstable();
        ring
    }

    /// Position of `key` on the ring.
    pub fn token_for(&self, key: impl AsRef<[u8]>) -> HashToken {
        self.partitioner.partition(key.as_ref())
    }

    /// Index of the first vnode at or after `token`, wrapping to 0.
    fn start_index(&self, token: HashToken) -> usize {
        let idx = self.vnodes.partition_point(|vnode| vnode.token < token);
        if idx == self.vnodes.len() {
            0
        } else {
            idx
        }
    }

    /// Distinct nodes in clockwise order starting at the owner of `key`.
    pub fn walk(&self, key: &[u8]) -> impl Iterator<Item = &NodeId> + '_ {
        let start = if self.vnodes.is_empty() {
            0
        } else {
            self.start_index(self.token_for(key))
        };
        let mut seen = HashSet::with_capacity(self.nodes.len());
        self.vnodes[start..]
            .iter()
            .chain(self.vnodes[..start].iter())
            .map(|vnode| &vnode.node_id)
            .filter(move |id| seen.insert(*id))
    }

    /// The node responsible for `key`: the first vnode whose token is
    /// `>= hash(key)`, wrapping to the smallest token.
    pub fn owner_of(&self, key: impl AsRef<[u8]>) -> Result<NodeId> {
        self.walk(key.as_ref()).next().cloned().ok_or(Error::NoAliveNodes)
    }

    /// Owner of `key` followed by the next distinct nodes clockwise, at most
    /// `n` long and never longer than the number of nodes on the ring.
    pub fn preference_list(&self, key: impl AsRef<[u8]>, n: usize) -> Result<Vec<NodeId>> {
        if self.vnodes.is_empty() {
            return Err(Error::NoAliveNodes);
        }
        Ok(self.walk(key.as_ref()).take(n).cloned().collect())
    }

    /// Number of physical nodes on the ring.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of tokens (virtual nodes) on the ring.
    pub fn token_count(&self) -> usize {
        self.vnodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vnodes.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains(id)
    }

    /// Physical nodes, sorted by address.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.nodes.iter().cloned().collect()
    }

    /// All `(token, node)` pairs in ring order.
    pub fn tokens(&self) -> Vec<(HashToken, NodeId)> {
        self.vnodes
            .iter()
            .map(|vnode| (vnode.token, vnode.node_id.clone()))
            .collect()
    }

    pub fn partitioner(&self) -> &SharedPartitioner {
        &self.partitioner
    }

    pub fn partitioner_name(&self) -> &'static str {
        self.partitioner.name()
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HashRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashRing")
            .field("nodes", &self.nodes)
            .field("tokens", &self.vnodes.len())
            .field("partitioner", &self.partitioner.name())
            .finish()
    }
}
