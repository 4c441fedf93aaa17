//! SipHash partitioner.

use std::hash::Hasher;

use siphasher::sip::SipHasher13;

use crate::partitioner::traits::Partitioner;
use crate::token::Token64;

/// Keyed SipHash-1-3 over the raw key bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct SipPartitioner {
    k0: u64,
    k1: u64,
}

impl SipPartitioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys(k0: u64, k1: u64) -> Self {
        Self { k0, k1 }
    }
}

impl Partitioner for SipPartitioner {
    type TokenType = Token64;

    fn partition(&self, key: &[u8]) -> Self::TokenType {
        let mut hasher = SipHasher13::new_with_keys(self.k0, self.k1);
        hasher.write(key);
        Token64(hasher.finish())
    }

    fn name(&self) -> &'static str {
        "SipPartitioner"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed() {
        let a = SipPartitioner::new();
        let b = SipPartitioner::with_keys(1, 2);
        assert_eq!(a.partition(b"key"), SipPartitioner::default().partition(b"key"));
        assert_ne!(a.partition(b"key"), b.partition(b"key"));
    }
}
