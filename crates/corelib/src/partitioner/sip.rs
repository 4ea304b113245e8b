//! SipHash partitioner, the default key hasher.

use crate::partitioner::traits::Partitioner;
use crate::token::HashToken;
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// SipHash-1-3 with the fixed all-zero key.
#[derive(Clone, Copy, Debug, Default)]
pub struct SipPartitioner;

impl Partitioner for SipPartitioner {
    type TokenType = HashToken;

    fn partition(&self, key: &[u8]) -> Self::TokenType {
        let mut hasher = SipHasher13::new();
        hasher.write(key);
        HashToken(hasher.finish())
    }

    fn name(&self) -> &'static str {
        "SipPartitioner"
    }
}
