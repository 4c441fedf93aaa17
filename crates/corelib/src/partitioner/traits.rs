//! Core partitioner trait definitions.

use crate::token::Token;

/// A partitioner converts byte strings into tokens for placement on the hash
/// ring.
///
/// Both node replicas and lookup keys go through the same partitioner, which
/// is what puts them into one shared hash space. Output should be roughly
/// uniform with low collision probability; cryptographic strength is not
/// required.
///
/// Partitioners are stateless and thread-safe, allowing concurrent
/// token generation without synchronization overhead.
pub trait Partitioner: Send + Sync + 'static {
    /// The token type produced by this partitioner.
    type TokenType: Token;

    /// Converts a key into a token.
    fn partition(&self, key: &[u8]) -> Self::TokenType;

    /// Returns the name of this partitioner.
    fn name(&self) -> &'static str;
}
