//! Partitioner abstraction for consistent hashing.
//!
//! Partitioners are responsible for converting keys into tokens
//! that can be placed on the hash ring. Every node of a cluster must use the
//! same partitioner, otherwise they disagree on ownership.

pub mod sip;
pub mod traits;
pub mod xxh3;

use crate::error::{Error, Result};
use crate::token::HashToken;
use std::sync::Arc;

pub use sip::SipPartitioner;
pub use traits::Partitioner;
pub use xxh3::Xxh3Partitioner;

/// A partitioner shared between the membership table and every ring snapshot.
pub type SharedPartitioner = Arc<dyn Partitioner<TokenType = HashToken>>;

/// The partitioner used when nothing else is configured.
pub fn default_partitioner() -> SharedPartitioner {
    Arc::new(SipPartitioner)
}

/// Looks a partitioner up by its short name (`sip` or `xxh3`).
pub fn from_name(name: &str) -> Result<SharedPartitioner> {
    match name.trim().to_ascii_lowercase().as_str() {
        "sip" | "siphash" => Ok(Arc::new(SipPartitioner)),
        "xxh3" | "xxhash" => Ok(Arc::new(Xxh3Partitioner)),
        other => Err(Error::InvalidToken(format!("unknown partitioner {other:?}"))),
    }
}
