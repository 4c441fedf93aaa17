//! CRC-32 partitioner.

use crate::partitioner::traits::Partitioner;
use crate::token::Token32;

/// IEEE CRC-32 checksum of the key.
///
/// A 32-bit space is plenty for rings of a few thousand points. Switch to a
/// 64-bit partitioner when the point count makes checksum collisions a
/// concern.
#[derive(Clone, Copy, Debug, Default)]
pub struct Crc32Partitioner;

impl Partitioner for Crc32Partitioner {
    type TokenType = Token32;

    fn partition(&self, key: &[u8]) -> Self::TokenType {
        Token32(crc32fast::hash(key))
    }

    fn name(&self) -> &'static str {
        "Crc32Partitioner"
    }
}
