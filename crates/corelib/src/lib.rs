//! Core library for the ringkv hash ring.
//!
//! This crate provides the fundamental abstractions every node shares:
//! - Token types and the partitioners (key hashers) that produce them
//! - Node identity and liveness
//! - Virtual nodes and the immutable ring snapshot used for routing
//! - The membership table that ring snapshots are derived from

pub mod error;
pub mod membership;
pub mod node;
pub mod partitioner;
pub mod ring;
pub mod token;
pub mod vnode;

pub use error::{Error, Result};
pub use membership::{Membership, MembershipChange};
pub use node::{Node, NodeId, NodeState};
pub use partitioner::{Partitioner, SharedPartitioner, SipPartitioner, Xxh3Partitioner};
pub use ring::{HashRing, RingBuilder};
pub use token::{HashToken, Token};
pub use vnode::VirtualNode;
