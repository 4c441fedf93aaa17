//! Partitioner abstraction for consistent hashing.
//!
//! Partitioners are responsible for converting keys into tokens
//! that can be placed on the hash ring. The hash function is a strategy
//! chosen when the ring is built; it cannot change afterwards because every
//! stored point depends on it.

pub mod blake3;
pub mod crc32;
pub mod sip;
pub mod traits;
pub mod xxh3;

pub use self::blake3::Blake3Partitioner;
pub use self::crc32::Crc32Partitioner;
pub use self::sip::SipPartitioner;
pub use self::traits::Partitioner;
pub use self::xxh3::Xxh3Partitioner;
