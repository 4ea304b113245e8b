//! In-process transport: a whole cluster inside one runtime.
//!
//! Nodes are registered by id and called directly. Reachability can be
//! switched per node to simulate crashes.

use crate::error::TransportError;
use crate::node::{ClusterNode, NodeOptions};
use crate::transport::PeerTransport;
use crate::version::Versioned;
use async_trait::async_trait;
use corelib::NodeId;
use dashmap::{DashMap, DashSet};
use std::sync::{Arc, Weak};

/// Shared by every node of a simulated cluster.
#[derive(Default)]
pub struct MemoryTransport {
    nodes: DashMap<NodeId, Weak<ClusterNode<MemoryTransport>>>,
    down: DashSet<NodeId>,
}

impl MemoryTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a node wired to this transport and registers it.
    pub fn spawn(self: &Arc<Self>, options: NodeOptions) -> Arc<ClusterNode<MemoryTransport>> {
        let node = Arc::new(ClusterNode::new(options, Arc::clone(self)));
        self.nodes
            .insert(node.local_id().clone(), Arc::downgrade(&node));
        node
    }

    /// Makes every call to `id` fail (`true`) or succeed again (`false`).
    pub fn set_down(&self, id: &NodeId, down: bool) {
        if down {
            self.down.insert(id.clone());
        } else {
            self.down.remove(id);
        }
    }

    fn target(&self, peer: &NodeId) -> Result<Arc<ClusterNode<MemoryTransport>>, TransportError> {
        let unreachable = |reason: &str| TransportError::Unreachable {
            peer: peer.clone(),
            reason: reason.to_string(),
        };
        if self.down.contains(peer) {
            return Err(unreachable("node is down"));
        }
        self.nodes
            .get(peer)
            .and_then(|entry| entry.value().upgrade())
            .ok_or_else(|| unreachable("no such node"))
    }

    fn unavailable(peer: &NodeId) -> TransportError {
        TransportError::Status {
            peer: peer.clone(),
            status: 503,
        }
    }
}

#[async_trait]
impl PeerTransport for MemoryTransport {
    async fn replicate(
        &self,
        peer: &NodeId,
        key: &str,
        entry: &Versioned,
    ) -> Result<(), TransportError> {
        self.target(peer)?.store_replica(key, entry.clone());
        Ok(())
    }

    async fn forward_write(
        &self,
        peer: &NodeId,
        key: &str,
        entry: &Versioned,
    ) -> Result<(), TransportError> {
        let node = self.target(peer)?;
        node.write_forwarded(key, entry)
            .await
            .map(|_| ())
            .map_err(|_| Self::unavailable(peer))
    }

    async fn fetch(&self, peer: &NodeId, key: &str) -> Result<Option<String>, TransportError> {
        Ok(self.target(peer)?.read_local(key))
    }

    async fn exchange(
        &self,
        peer: &NodeId,
        from: &NodeId,
        known: &[NodeId],
    ) -> Result<Vec<NodeId>, TransportError> {
        let node = self.target(peer)?;
        node.accept_exchange(from, known)
            .await
            .map_err(|_| Self::unavailable(peer))
    }
}
