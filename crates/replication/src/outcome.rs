//! Per-operation reports. Peer failures end up here instead of in an error.

use crate::error::TransportError;
use corelib::{MembershipChange, NodeId};
use serde::Serialize;

/// Why a write was sent to a peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForwardKind {
    /// Store a copy; the peer is in the preference list.
    Replica,
    /// Ask the peer to coordinate the write; the local node is not in the
    /// preference list.
    Route,
}

/// Result of one peer call made on behalf of a write.
#[derive(Clone, Debug)]
pub struct ForwardOutcome {
    pub peer: NodeId,
    pub kind: ForwardKind,
    pub result: Result<(), TransportError>,
}

impl ForwardOutcome {
    pub fn new(peer: NodeId, kind: ForwardKind, result: Result<(), TransportError>) -> Self {
        Self { peer, kind, result }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// What a write did. A write with failed outcomes still succeeded; the
/// failing peers are marked dead and listed in `dead_peers`.
#[derive(Clone, Debug, Default)]
pub struct WriteReport {
    pub stored_locally: bool,
    pub outcomes: Vec<ForwardOutcome>,
    pub dead_peers: Vec<NodeId>,
}

impl WriteReport {
    /// Number of copies known to be written (local one included).
    pub fn copies(&self) -> usize {
        usize::from(self.stored_locally)
            + self
                .outcomes
                .iter()
                .filter(|o| o.kind == ForwardKind::Replica && o.is_success())
                .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ForwardOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// Summary of one reconciliation run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Passes run; a pass repeats when a push target turned out dead.
    pub passes: usize,
    /// Keys looked at in the last pass.
    pub examined: usize,
    /// Keys kept locally in the last pass.
    pub retained: usize,
    /// Successful pushes to other nodes.
    pub pushed: usize,
    /// Keys deleted locally after being handed off.
    pub dropped: usize,
    /// Peers marked dead while pushing.
    pub failed_peers: Vec<NodeId>,
}

impl ReconcileReport {
    /// True when nothing moved.
    pub fn is_noop(&self) -> bool {
        self.pushed == 0 && self.dropped == 0
    }
}

/// Result of joining a peer.
#[derive(Clone, Debug)]
pub struct JoinReport {
    pub peer: NodeId,
    pub change: MembershipChange,
    /// Nodes learned transitively through exchanges.
    pub learned: Vec<NodeId>,
    /// Peers that failed an exchange and were marked dead.
    pub unreachable: Vec<NodeId>,
    pub reconcile: ReconcileReport,
}
