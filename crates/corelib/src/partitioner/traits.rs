//! Key hasher trait.

use crate::token::Token;

/// Maps keys and node addresses onto ring positions.
///
/// Every process of a cluster must map the same bytes to the same token, so
/// implementations are pure functions of their input: no per-process seeds
/// and no state.
pub trait Partitioner: Send + Sync + 'static {
    type TokenType: Token;

    fn partition(&self, key: &[u8]) -> Self::TokenType;

    /// Short name used in logs and `Debug` output.
    fn name(&self) -> &'static str;
}
