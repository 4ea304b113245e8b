//! Replication engine for ringkv.
//!
//! This crate turns a ring snapshot into a running node:
//! - How many copies of a key exist and where (replication strategies)
//! - The in-memory store holding this node's share of the keyspace
//! - Write versions, so copies only ever move forward
//! - Write/read coordination across the preference list
//! - Failure detection on failed peer calls
//! - Reconciliation that moves keys after every membership change
//! - Membership exchange so joins propagate transitively
//!
//! Peers are reached through the [`PeerTransport`] seam; the HTTP
//! implementation lives in the `transport` crate, an in-process one in
//! [`transport::memory`].

pub mod coordinator;
pub mod detector;
pub mod discovery;
pub mod error;
pub mod node;
pub mod outcome;
pub mod reconciler;
pub mod store;
pub mod strategy;
pub mod transport;
pub mod version;

pub use error::{ReplicationError, TransportError};
pub use node::{ClusterNode, NodeOptions};
pub use outcome::{ForwardKind, ForwardOutcome, JoinReport, ReconcileReport, WriteReport};
pub use store::LocalStore;
pub use strategy::{ReplicationStrategy, SimpleStrategy};
pub use transport::{MemoryTransport, PeerTransport};
pub use version::{HybridClock, ParseVersionError, Version, Versioned};
