//! XXH3 partitioner.

use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::partitioner::traits::Partitioner;
use crate::token::Token64;

/// Seeded 64-bit XXH3.
#[derive(Clone, Copy, Debug, Default)]
pub struct Xxh3Partitioner {
    seed: u64,
}

impl Xxh3Partitioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a non-default seed. Rings sharing keys must agree on the seed.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }
}

impl Partitioner for Xxh3Partitioner {
    type TokenType = Token64;

    fn partition(&self, key: &[u8]) -> Self::TokenType {
        Token64(xxh3_64_with_seed(key, self.seed))
    }

    fn name(&self) -> &'static str {
        "Xxh3Partitioner"
    }
}
