//! 64-bit hash token, the position type of every ring in this workspace.

use crate::error::{Error, Result};
use crate::token::traits::Token;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A position on a ring of size 2^64.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct HashToken(pub u64);

impl Token for HashToken {
    fn zero() -> Self {
        HashToken(0)
    }

    fn max() -> Self {
        HashToken(u64::MAX)
    }

    fn distance_to(&self, other: &Self) -> Self {
        HashToken(other.0.wrapping_sub(self.0))
    }
}

impl fmt::Display for HashToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for HashToken {
    type Err = Error;

    /// Parses the 16-digit hex form produced by `Display`.
    fn from_str(s: &str) -> Result<Self> {
        u64::from_str_radix(s, 16)
            .map(HashToken)
            .map_err(|e| Error::InvalidToken(format!("{s:?}: {e}")))
    }
}
