//! Endpoints and payloads.
//!
//! Values travel as raw request and response bodies; only membership
//! exchange and stats use JSON. Copies sent between nodes carry their write
//! version in [`VERSION_HEADER`].

use corelib::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// --- Public API ---

/// `PUT` stores a value, `GET` reads it from anywhere in the cluster.
pub const ENDPOINT_DATA: &str = "/data";
/// Known peers, one per line, dead ones as `dead:<address>`.
pub const ENDPOINT_PEERS: &str = "/peers";
/// Body is the base URL of the peer to join.
pub const ENDPOINT_JOIN: &str = "/peers/join";
/// Replication factor of this node, as a decimal integer.
pub const ENDPOINT_SETTINGS_N: &str = "/settings/n";
/// Local keys as [`StatsResponse`].
pub const ENDPOINT_STATS_KEYS: &str = "/stats/keys";

// --- Internal API ---

/// Store a copy without coordination.
pub const ENDPOINT_REPLICATE: &str = "/internal/replicate";
/// Coordinate a write routed by a node outside the preference list.
pub const ENDPOINT_ROUTE: &str = "/internal/route";
/// Read from the local store only; 404 when absent.
pub const ENDPOINT_GET_INTERNAL: &str = "/internal/data";
/// Membership exchange, [`ExchangeRequest`] in, [`ExchangeResponse`] out.
pub const ENDPOINT_EXCHANGE: &str = "/internal/peers/exchange";
/// Run a reconciliation now and return its report.
pub const ENDPOINT_RECONCILE: &str = "/internal/reconcile";

/// Version of the copy in the body of a replicate or route call, as
/// `<wall_time>.<counter>`.
pub const VERSION_HEADER: &str = "x-ringkv-version";

/// Sent by a node announcing itself and the nodes it believes alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRequest {
    pub from: NodeId,
    pub peers: Vec<NodeId>,
}

/// Alive members of the receiving node, itself included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeResponse {
    pub peers: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResponse {
    /// Number of keys held locally.
    pub count: usize,
    pub data: BTreeMap<String, String>,
}

impl StatsResponse {
    pub fn new(data: BTreeMap<String, String>) -> Self {
        Self {
            count: data.len(),
            data,
        }
    }
}
