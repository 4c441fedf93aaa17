//! BLAKE3 partitioner.

use crate::partitioner::traits::Partitioner;
use crate::token::Token64;

/// First eight bytes of the BLAKE3 digest, little-endian.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake3Partitioner;

impl Partitioner for Blake3Partitioner {
    type TokenType = Token64;

    fn partition(&self, key: &[u8]) -> Self::TokenType {
        let hash = blake3::hash(key);
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&hash.as_bytes()[..8]);
        Token64(u64::from_le_bytes(prefix))
    }

    fn name(&self) -> &'static str {
        "Blake3Partitioner"
    }
}
