//! Consistent hash ring implementation.
//!
//! The ring manages token positions and provides efficient lookup
//! operations for finding nodes responsible for keys.

pub mod builder;
pub mod ring;
pub mod snapshot;

pub use builder::RingBuilder;
pub use ring::{HashRing, DEFAULT_VNODES};
pub use snapshot::RingSnapshot;
