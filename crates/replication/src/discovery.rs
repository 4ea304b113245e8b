//! Joining: membership exchange between nodes.
//!
//! A join is a two-way exchange. The joining side sends its alive members
//! and merges the answer, first with the new peer and then with every other
//! alive peer, so nodes that never joined each other directly still learn
//! about one another. Rounds repeat until nothing new is learned.

use crate::error::ReplicationError;
use crate::node::ClusterNode;
use crate::outcome::JoinReport;
use crate::transport::PeerTransport;
use corelib::{Error, NodeId};

impl<T: PeerTransport> ClusterNode<T> {
    /// Joins `peer` and spreads the news to every known node, then
    /// reconciles. An unreachable peer is reported, not returned as error.
    pub async fn join(&self, peer: &NodeId) -> Result<JoinReport, ReplicationError> {
        let local = self.local_id().clone();
        if *peer == local {
            return Err(Error::InvalidNode(format!("{peer} is this node")).into());
        }

        let change = self.membership.join(peer);
        tracing::info!(%peer, ?change, "joining peer");

        let mut learned = Vec::new();
        let mut unreachable = Vec::new();
        loop {
            let known = self.membership.alive();
            let mut targets: Vec<NodeId> = Vec::with_capacity(known.len());
            if known.contains(peer) {
                targets.push(peer.clone());
            }
            targets.extend(
                known
                    .iter()
                    .filter(|id| **id != local && *id != peer)
                    .cloned(),
            );

            let mut learned_this_round = Vec::new();
            for target in &targets {
                match self.transport.exchange(target, &local, &known).await {
                    Ok(theirs) => learned_this_round.extend(self.membership.merge(&theirs)),
                    Err(err) => {
                        if self.peer_failed(&err) {
                            unreachable.push(target.clone());
                        }
                    }
                }
            }

            if learned_this_round.is_empty() {
                break;
            }
            tracing::info!(learned = learned_this_round.len(), "learned peers, announcing again");
            learned.extend(learned_this_round);
        }

        let reconcile = self.reconcile().await?;
        Ok(JoinReport {
            peer: peer.clone(),
            change,
            learned,
            unreachable,
            reconcile,
        })
    }

    /// Receiving side of an exchange: `from` is alive (it just talked to
    /// us), unknown nodes in `known` are added, and keys are reconciled if
    /// anything changed. Returns this node's alive members.
    pub async fn accept_exchange(
        &self,
        from: &NodeId,
        known: &[NodeId],
    ) -> Result<Vec<NodeId>, ReplicationError> {
        let mut changed = self.membership.join(from).is_change();
        changed |= !self.membership.merge(known).is_empty();
        if changed {
            self.reconcile().await?;
        }
        Ok(self.membership.alive())
    }
}
