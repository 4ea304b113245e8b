//! Node abstractions for the consistent hash ring.
//!
//! A node is identified by the base URL peers use to reach it. The identity
//! is also what gets hashed onto the ring, so every process derives the same
//! position for a given node without coordination.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier for a node in the cluster: its normalized network address.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Normalizes an address: surrounding whitespace and trailing `/` are
    /// dropped so `http://a:1/` and `http://a:1` name the same node.
    pub fn parse(address: &str) -> Result<Self> {
        let trimmed = address.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(Error::InvalidNode(format!("empty address {address:?}")));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(Error::InvalidNode(format!("address contains whitespace: {trimmed:?}")));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NodeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Liveness of a known node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Alive,
    Dead,
}

/// A member of the membership table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub state: NodeState,
}

impl Node {
    pub fn new(id: NodeId, state: NodeState) -> Self {
        Self { id, state }
    }

    pub fn is_alive(&self) -> bool {
        self.state == NodeState::Alive
    }
}

/// Peer listing form: alive nodes print their address, dead ones `dead:<address>`.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            NodeState::Alive => write!(f, "{}", self.id),
            NodeState::Dead => write!(f, "dead:{}", self.id),
        }
    }
}
