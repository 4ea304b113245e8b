//! Topology reconciliation: after a membership change, move every local key
//! to the nodes that should hold it now and drop copies this node no longer
//! owns.
//!
//! Runs on each node independently, from that node's view of the
//! membership. Runs are serialized per node. Each run compares preference
//! lists under the current ring and replication factor with those under the
//! ring and factor of the previous run:
//!
//! - not a member anymore: push the key to every member of the new list,
//!   then drop the local copy once at least one push landed
//! - still a member: push the key to members that were not in the old list
//!
//! A second run with no membership or factor change in between moves
//! nothing.

use crate::error::ReplicationError;
use crate::node::ClusterNode;
use crate::outcome::ReconcileReport;
use crate::transport::PeerTransport;
use crate::version::Versioned;
use corelib::{HashRing, NodeId};

/// What the previous run placed keys against.
pub(crate) struct Reconciled {
    ring: HashRing,
    replication_factor: usize,
}

impl Reconciled {
    pub(crate) fn new(ring: HashRing, replication_factor: usize) -> Self {
        Self {
            ring,
            replication_factor,
        }
    }
}

impl<T: PeerTransport> ClusterNode<T> {
    pub async fn reconcile(&self) -> Result<ReconcileReport, ReplicationError> {
        let mut previous = self.last_reconciled.lock().await;
        let local = self.local_id().clone();
        let mut report = ReconcileReport::default();

        loop {
            report.passes += 1;
            report.examined = 0;
            report.retained = 0;

            let ring = self.membership.ring();
            let factor = self.strategy.replication_factor();
            let mut newly_dead: Vec<NodeId> = Vec::new();

            for (key, entry) in self.store.entries() {
                report.examined += 1;
                let current = self.strategy.replicas_with_factor(&ring, &key, factor)?;

                if current.contains(&local) {
                    report.retained += 1;
                    let before = self
                        .strategy
                        .replicas_with_factor(&previous.ring, &key, previous.replication_factor)
                        .unwrap_or_default();
                    let added = current
                        .iter()
                        .filter(|node| **node != local && !before.contains(node));
                    for target in added {
                        if self.push(target, &key, &entry, &mut newly_dead).await {
                            report.pushed += 1;
                        }
                    }
                    continue;
                }

                self.hand_off(&key, entry, &current, &mut report, &mut newly_dead)
                    .await;
            }

            *previous = Reconciled::new(ring, factor);
            if newly_dead.is_empty() {
                break;
            }
            report.failed_peers.extend(newly_dead);
        }

        if report.is_noop() {
            tracing::debug!(examined = report.examined, "reconciliation moved nothing");
        } else {
            tracing::info!(
                examined = report.examined,
                pushed = report.pushed,
                dropped = report.dropped,
                passes = report.passes,
                "reconciliation finished"
            );
        }
        Ok(report)
    }

    /// Pushes a key this node no longer owns to `targets` and drops the
    /// local copy. A newer write that lands locally while the push is in
    /// flight is handed off in turn.
    async fn hand_off(
        &self,
        key: &str,
        mut entry: Versioned,
        targets: &[NodeId],
        report: &mut ReconcileReport,
        newly_dead: &mut Vec<NodeId>,
    ) {
        loop {
            let mut delivered = false;
            for target in targets {
                if self.push(target, key, &entry, newly_dead).await {
                    report.pushed += 1;
                    delivered = true;
                }
            }
            if !delivered {
                tracing::warn!(key, "no preference-list member reachable, keeping key");
                return;
            }
            if self.store.remove_if_unchanged(key, &entry) {
                tracing::debug!(key, "dropped key after handoff");
                report.dropped += 1;
                return;
            }
            match self.store.get_versioned(key) {
                Some(newer) => entry = newer,
                None => return,
            }
        }
    }

    async fn push(
        &self,
        target: &NodeId,
        key: &str,
        entry: &Versioned,
        newly_dead: &mut Vec<NodeId>,
    ) -> bool {
        match self.transport.replicate(target, key, entry).await {
            Ok(()) => true,
            Err(err) => {
                if self.peer_failed(&err) {
                    newly_dead.push(target.clone());
                }
                false
            }
        }
    }
}
