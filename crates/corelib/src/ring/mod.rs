//! Consistent hash ring implementation.
//!
//! The ring is an immutable snapshot of alive nodes ordered by token. It is
//! rebuilt from the membership table whenever routing needs it, so readers
//! never observe a half-applied membership change.

pub mod builder;
pub mod ring;

pub use builder::RingBuilder;
pub use ring::HashRing;
