//! Token trait shared by every partitioner.

use std::fmt::{Debug, Display};
use std::hash::Hash;

/// A position on the ring.
///
/// The ring wraps: the successor of [`Token::max`] is [`Token::zero`], and
/// distances are measured clockwise.
pub trait Token: Copy + Ord + Hash + Send + Sync + Debug + Display + 'static {
    /// First position of the ring.
    fn zero() -> Self;
    /// Last position of the ring.
    fn max() -> Self;
    /// Clockwise distance from `self` to `other`, wrapping past `max`.
    fn distance_to(&self, other: &Self) -> Self;
}
