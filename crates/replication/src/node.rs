//! A cluster node: membership table, local store, replication strategy and
//! transport wired together.
//!
//! Behavior is split across modules by concern: [`crate::coordinator`]
//! (reads and writes), [`crate::detector`] (failure handling),
//! [`crate::reconciler`] (moving keys) and [`crate::discovery`] (joins).

use crate::reconciler::Reconciled;
use crate::store::LocalStore;
use crate::strategy::{ReplicationStrategy, SimpleStrategy};
use crate::version::HybridClock;
use corelib::partitioner::{default_partitioner, SharedPartitioner};
use corelib::{Membership, NodeId};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Startup settings of a node.
#[derive(Clone)]
pub struct NodeOptions {
    /// Address peers use to reach this node; also its ring identity.
    pub address: NodeId,
    /// Copies per key, owner included.
    pub replication_factor: usize,
    /// Ring positions per node.
    pub vnodes: usize,
    pub partitioner: SharedPartitioner,
}

impl NodeOptions {
    pub fn new(address: NodeId) -> Self {
        Self {
            address,
            replication_factor: 1,
            vnodes: 1,
            partitioner: default_partitioner(),
        }
    }

    pub fn with_replication_factor(mut self, factor: usize) -> Self {
        self.replication_factor = factor;
        self
    }

    pub fn with_vnodes(mut self, vnodes: usize) -> Self {
        self.vnodes = vnodes;
        self
    }

    pub fn with_partitioner(mut self, partitioner: SharedPartitioner) -> Self {
        self.partitioner = partitioner;
        self
    }
}

impl fmt::Debug for NodeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeOptions")
            .field("address", &self.address)
            .field("replication_factor", &self.replication_factor)
            .field("vnodes", &self.vnodes)
            .field("partitioner", &self.partitioner.name())
            .finish()
    }
}

/// One member of the cluster.
///
/// Shared state is owned here and passed by reference to every handler;
/// there are no globals. The membership table and the store each have their
/// own lock, and reconciliation is serialized by `last_reconciled`, which
/// also remembers the ring and replication factor of the previous run.
pub struct ClusterNode<T> {
    pub(crate) membership: Arc<Membership>,
    pub(crate) store: Arc<LocalStore>,
    pub(crate) strategy: Box<dyn ReplicationStrategy>,
    pub(crate) transport: Arc<T>,
    pub(crate) clock: HybridClock,
    pub(crate) last_reconciled: Mutex<Reconciled>,
}

impl<T> ClusterNode<T> {
    pub fn new(options: NodeOptions, transport: Arc<T>) -> Self {
        let strategy = Box::new(SimpleStrategy::new(options.replication_factor));
        Self::with_strategy(options, strategy, transport)
    }

    pub fn with_strategy(
        options: NodeOptions,
        strategy: Box<dyn ReplicationStrategy>,
        transport: Arc<T>,
    ) -> Self {
        let membership = Arc::new(Membership::with_ring_config(
            options.address,
            options.partitioner,
            options.vnodes,
        ));
        let initial = Reconciled::new(membership.ring(), strategy.replication_factor());
        tracing::info!(
            node = %membership.local_id(),
            strategy = strategy.name(),
            replication_factor = strategy.replication_factor(),
            "node initialized"
        );
        Self {
            membership,
            store: Arc::new(LocalStore::new()),
            strategy,
            transport,
            clock: HybridClock::new(),
            last_reconciled: Mutex::new(initial),
        }
    }

    pub fn local_id(&self) -> &NodeId {
        self.membership.local_id()
    }

    pub fn membership(&self) -> &Arc<Membership> {
        &self.membership
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn replication_factor(&self) -> usize {
        self.strategy.replication_factor()
    }

    /// Takes effect for new writes immediately; stored keys follow at the
    /// next reconciliation.
    pub fn set_replication_factor(&self, factor: usize) -> corelib::Result<()> {
        self.strategy.set_replication_factor(factor)
    }

    /// Preference list of `key` under the current membership.
    pub fn preference_list(&self, key: &str) -> corelib::Result<Vec<NodeId>> {
        self.strategy
            .replicas_for_key(&self.membership.ring(), key)
    }
}

impl<T> fmt::Debug for ClusterNode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterNode")
            .field("local", self.local_id())
            .field("members", &self.membership.len())
            .field("keys", &self.store.len())
            .field("replication_factor", &self.replication_factor())
            .finish()
    }
}
