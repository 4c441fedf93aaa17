//! Core token trait definitions.

use std::fmt::{Debug, Display};
use std::hash::Hash;

/// A position on the hash ring.
///
/// Tokens are fixed-width unsigned integers in `[0, 2^BITS)`. They are
/// compared as unsigned values only, so ordering never depends on sign.
/// Implementations must be thread-safe and cheap to copy/compare/hash.
pub trait Token: Copy + Ord + Hash + Send + Sync + Debug + Display + 'static {
    /// Width of the hash space in bits.
    const BITS: u32;

    /// True if this token is the start of the ring.
    fn is_zero(&self) -> bool;
    /// Clockwise distance from `self` to `other` on the ring.
    fn distance_to(&self, other: &Self) -> Self;
    /// Widened numeric value of the token.
    fn as_u64(&self) -> u64;

    /// Number of distinct positions on the ring, i.e. `2^BITS`.
    fn ring_size() -> u128 {
        1u128 << Self::BITS
    }
}
