//! Token abstraction module for consistent hashing.
//!
//! Tokens represent positions on the hash ring and must be comparable,
//! hashable, and thread-safe.

pub mod fixed;
pub mod traits;

pub use fixed::{Token32, Token64};
pub use traits::Token;
