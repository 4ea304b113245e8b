//! Membership table: every node this process knows about and whether it is
//! currently considered alive.
//!
//! Nodes are never removed. A node that failed a request is kept as
//! [`NodeState::Dead`] for reporting and excluded from ring snapshots until it
//! joins again.

use crate::node::{Node, NodeId, NodeState};
use crate::partitioner::{default_partitioner, SharedPartitioner};
use crate::ring::HashRing;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;

/// Effect of a join on the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MembershipChange {
    /// The node was unknown and is now alive.
    Added,
    /// The node was dead and is alive again.
    Revived,
    /// The node was already alive (or is the local node).
    Unchanged,
}

impl MembershipChange {
    pub fn is_change(self) -> bool {
        !matches!(self, MembershipChange::Unchanged)
    }
}

#[derive(Debug)]
struct Table {
    states: BTreeMap<NodeId, NodeState>,
    epoch: u64,
}

/// The set of known nodes, the local one included.
///
/// All reads and writes go through one `RwLock`; ring snapshots are built
/// under the read guard so they always reflect a complete table.
pub struct Membership {
    local: NodeId,
    table: RwLock<Table>,
    partitioner: SharedPartitioner,
    vnodes: usize,
}

impl Membership {
    /// A table containing only `local`, one vnode per node, default partitioner.
    pub fn new(local: NodeId) -> Self {
        Self::with_ring_config(local, default_partitioner(), 1)
    }

    pub fn with_ring_config(local: NodeId, partitioner: SharedPartitioner, vnodes: usize) -> Self {
        let mut states = BTreeMap::new();
        states.insert(local.clone(), NodeState::Alive);
        Self {
            local,
            table: RwLock::new(Table { states, epoch: 0 }),
            partitioner,
            vnodes: vnodes.max(1),
        }
    }

    pub fn local_id(&self) -> &NodeId {
        &self.local
    }

    /// Adds `id` as alive, or revives it if it was dead.
    pub fn join(&self, id: &NodeId) -> MembershipChange {
        if id == &self.local {
            return MembershipChange::Unchanged;
        }
        let mut table = self.table.write();
        let change = match table.states.get(id) {
            None => MembershipChange::Added,
            Some(NodeState::Dead) => MembershipChange::Revived,
            Some(NodeState::Alive) => MembershipChange::Unchanged,
        };
        if change.is_change() {
            table.states.insert(id.clone(), NodeState::Alive);
            table.epoch += 1;
            tracing::info!(peer = %id, ?change, members = table.states.len(), "membership updated");
        }
        change
    }

    /// Adds every unknown node in `ids` as alive and returns the ones added.
    ///
    /// Known nodes keep their state: a peer's view cannot revive a node this
    /// process saw fail. Only a direct join does that.
    pub fn merge<'a, I>(&self, ids: I) -> Vec<NodeId>
    where
        I: IntoIterator<Item = &'a NodeId>,
    {
        let mut table = self.table.write();
        let mut added = Vec::new();
        for id in ids {
            if id == &self.local || table.states.contains_key(id) {
                continue;
            }
            table.states.insert(id.clone(), NodeState::Alive);
            added.push(id.clone());
        }
        if !added.is_empty() {
            table.epoch += 1;
            tracing::info!(
                added = added.len(),
                members = table.states.len(),
                "learned peers through exchange"
            );
        }
        added
    }

    /// Flips a known peer to dead. Returns `true` if its state changed.
    ///
    /// The local node and unknown nodes are ignored.
    pub fn mark_dead(&self, id: &NodeId) -> bool {
        if id == &self.local {
            return false;
        }
        let mut table = self.table.write();
        match table.states.get_mut(id) {
            Some(state) if *state == NodeState::Alive => {
                *state = NodeState::Dead;
                table.epoch += 1;
                tracing::warn!(peer = %id, "peer marked dead");
                true
            }
            _ => false,
        }
    }

    pub fn state(&self, id: &NodeId) -> Option<NodeState> {
        self.table.read().states.get(id).copied()
    }

    /// Every known node, the local one included, sorted by address.
    pub fn list(&self) -> Vec<Node> {
        self.table
            .read()
            .states
            .iter()
            .map(|(id, state)| Node::new(id.clone(), *state))
            .collect()
    }

    /// Every known node except the local one.
    pub fn peers(&self) -> Vec<Node> {
        self.list().into_iter().filter(|node| node.id != self.local).collect()
    }

    /// Alive nodes, the local one included.
    pub fn alive(&self) -> Vec<NodeId> {
        self.list()
            .into_iter()
            .filter(Node::is_alive)
            .map(|node| node.id)
            .collect()
    }

    /// Alive nodes except the local one.
    pub fn alive_peers(&self) -> Vec<NodeId> {
        self.alive().into_iter().filter(|id| id != &self.local).collect()
    }

    /// Ring snapshot of the alive nodes.
    pub fn ring(&self) -> HashRing {
        let table = self.table.read();
        HashRing::from_nodes(
            table
                .states
                .iter()
                .filter(|(_, state)| **state == NodeState::Alive)
                .map(|(id, _)| id.clone()),
            self.vnodes,
            self.partitioner.clone(),
        )
    }

    /// Monotonic counter bumped by every change to the table.
    pub fn epoch(&self) -> u64 {
        self.table.read().epoch
    }

    pub fn len(&self) -> usize {
        self.table.read().states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Membership")
            .field("local", &self.local)
            .field("members", &self.list())
            .field("partitioner", &self.partitioner.name())
            .field("vnodes", &self.vnodes)
            .finish()
    }
}
