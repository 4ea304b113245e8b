//! Ring positions.
//!
//! Every partitioner in this crate produces [`HashToken`]s; the [`Token`]
//! trait keeps the ring arithmetic independent of the concrete width.

pub mod hash;
pub mod traits;

pub use hash::HashToken;
pub use traits::Token;
