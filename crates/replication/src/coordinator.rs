//! Write and read coordination.
//!
//! A write lands on every node of the key's preference list: stored locally
//! when this node is a member, sent as a replica to the others. A node
//! outside the list routes the write to a member instead, so clients can
//! use any node as entry point. Peer failures never fail the write; the peer
//! is marked dead and the write is retried against the smaller ring if no
//! member accepted it.
//!
//! The node that accepts a client write stamps it with a version, and every
//! copy keeps that version, so stores can tell an older copy from a newer one.

use crate::error::ReplicationError;
use crate::node::ClusterNode;
use crate::outcome::{ForwardKind, ForwardOutcome, WriteReport};
use crate::transport::PeerTransport;
use crate::version::Versioned;
use corelib::NodeId;

impl<T: PeerTransport> ClusterNode<T> {
    /// Client write entry point.
    pub async fn write(&self, key: &str, value: &str) -> Result<WriteReport, ReplicationError> {
        let entry = Versioned::new(value, self.clock.now());
        self.coordinate(key, &entry, true).await
    }

    /// A write routed here by a node outside the preference list. It is not
    /// routed again: if this node is not a member either, it sends replicas
    /// to the members directly.
    pub async fn write_forwarded(
        &self,
        key: &str,
        entry: &Versioned,
    ) -> Result<WriteReport, ReplicationError> {
        self.clock.observe(entry.version);
        self.coordinate(key, entry, false).await
    }

    async fn coordinate(
        &self,
        key: &str,
        entry: &Versioned,
        may_route: bool,
    ) -> Result<WriteReport, ReplicationError> {
        let local = self.local_id().clone();
        let mut report = WriteReport::default();

        // Each failed round marks at least one preference-list member dead,
        // and the local node never dies, so this ends with the local node in
        // the list at the latest.
        loop {
            let prefs = self.preference_list(key)?;

            if prefs.contains(&local) {
                self.store.put(key, entry.clone());
                report.stored_locally = true;
                tracing::debug!(key, replicas = prefs.len() - 1, "stored as preference-list member");

                for peer in prefs.iter().filter(|peer| **peer != local) {
                    let result = self.transport.replicate(peer, key, entry).await;
                    self.record(&mut report, peer, ForwardKind::Replica, result);
                }
                break;
            }

            let delivered = if may_route {
                self.route(&mut report, &prefs, key, entry).await
            } else {
                self.fan_out(&mut report, &prefs, key, entry).await
            };
            if delivered {
                break;
            }
        }

        if !report.dead_peers.is_empty() {
            self.after_failures(&report.dead_peers).await;
        }
        Ok(report)
    }

    /// Hands the write to the first member that accepts it.
    async fn route(
        &self,
        report: &mut WriteReport,
        prefs: &[NodeId],
        key: &str,
        entry: &Versioned,
    ) -> bool {
        for peer in prefs {
            tracing::debug!(key, %peer, "routing write to preference-list member");
            let result = self.transport.forward_write(peer, key, entry).await;
            if self.record(report, peer, ForwardKind::Route, result) {
                return true;
            }
        }
        false
    }

    /// Sends a replica to every member; delivered if any accepted it.
    async fn fan_out(
        &self,
        report: &mut WriteReport,
        prefs: &[NodeId],
        key: &str,
        entry: &Versioned,
    ) -> bool {
        let mut delivered = false;
        for peer in prefs {
            let result = self.transport.replicate(peer, key, entry).await;
            delivered |= self.record(report, peer, ForwardKind::Replica, result);
        }
        delivered
    }

    /// Client read entry point.
    ///
    /// Local store first, then the preference list in order, then every
    /// other alive peer. `None` means no reachable node holds the key.
    pub async fn read(&self, key: &str) -> Result<Option<String>, ReplicationError> {
        if let Some(value) = self.store.get(key) {
            return Ok(Some(value));
        }

        let local = self.local_id().clone();
        let mut candidates = self.preference_list(key)?;
        for peer in self.membership.alive_peers() {
            if !candidates.contains(&peer) {
                candidates.push(peer);
            }
        }

        let mut dead = Vec::new();
        let mut found = None;
        for peer in candidates.iter().filter(|peer| **peer != local) {
            match self.transport.fetch(peer, key).await {
                Ok(Some(value)) => {
                    tracing::debug!(key, %peer, "read served by peer");
                    found = Some(value);
                    break;
                }
                Ok(None) => continue,
                Err(err) => {
                    if self.peer_failed(&err) {
                        dead.push(peer.clone());
                    }
                }
            }
        }

        if !dead.is_empty() {
            self.after_failures(&dead).await;
        }
        Ok(found)
    }

    /// Local-only read, served to peers.
    pub fn read_local(&self, key: &str) -> Option<String> {
        self.store.get(key)
    }

    /// Stores a copy pushed by a peer (replica write or reconciliation).
    /// Returns `false` when the local copy is already as recent.
    pub fn store_replica(&self, key: &str, entry: Versioned) -> bool {
        self.clock.observe(entry.version);
        let version = entry.version;
        let applied = self.store.put(key, entry);
        if applied {
            tracing::debug!(key, %version, "stored replica");
        } else {
            tracing::debug!(key, %version, "ignored replica older than local copy");
        }
        applied
    }
}
