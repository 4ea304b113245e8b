//! Passive failure detection.
//!
//! There is no heartbeat: a peer is marked dead the first time a call to it
//! fails, and stays dead until it joins again. Every newly dead peer
//! triggers a reconciliation on the surviving node.

use crate::error::TransportError;
use crate::node::ClusterNode;
use crate::outcome::{ForwardKind, ForwardOutcome, WriteReport};
use crate::transport::PeerTransport;
use corelib::NodeId;

impl<T: PeerTransport> ClusterNode<T> {
    /// Marks `peer` dead after a failure observed outside this crate and
    /// reconciles. Returns `true` if the peer was alive before.
    pub async fn report_failure(&self, peer: &NodeId) -> bool {
        let changed = self.membership.mark_dead(peer);
        if changed {
            self.after_failures(std::slice::from_ref(peer)).await;
        }
        changed
    }

    /// Marks the peer behind `err` dead. Returns `true` if it was alive.
    pub(crate) fn peer_failed(&self, err: &TransportError) -> bool {
        tracing::warn!(error = %err, "peer call failed");
        self.membership.mark_dead(err.peer())
    }

    /// Appends an outcome to `report`, marking the peer dead on failure.
    /// Returns whether the call succeeded.
    pub(crate) fn record(
        &self,
        report: &mut WriteReport,
        peer: &NodeId,
        kind: ForwardKind,
        result: Result<(), TransportError>,
    ) -> bool {
        let ok = result.is_ok();
        if let Err(err) = &result {
            if self.peer_failed(err) {
                report.dead_peers.push(peer.clone());
            }
        }
        report
            .outcomes
            .push(ForwardOutcome::new(peer.clone(), kind, result));
        ok
    }

    /// Reconciles after peers died. Errors are logged; the operation that
    /// noticed the failure has already succeeded.
    pub(crate) async fn after_failures(&self, dead: &[NodeId]) {
        tracing::info!(dead = ?dead, "reconciling after peer failure");
        if let Err(err) = self.reconcile().await {
            tracing::error!(error = %err, "reconciliation after peer failure failed");
        }
    }
}
