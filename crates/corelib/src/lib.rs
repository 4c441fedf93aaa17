//! Core library for consistent hashing implementation.
//!
//! This crate provides the fundamental abstractions for consistent hashing:
//! - Token types and implementations
//! - Partitioner (hash function) strategies
//! - Node identifiers and virtual nodes
//! - The hash ring, its snapshots and builder
//! - Ownership analysis over a ring
//!
//! ```
//! use corelib::{Error, HashRing};
//!
//! let ring = HashRing::builder()
//!     .with_vnodes(100)
//!     .add_nodes(["10.0.0.1:11211", "10.0.0.2:11211", "10.0.0.3:11211"])
//!     .build()?;
//!
//! let owner = ring.lookup("user:42")?;
//! assert!(ring.members().contains(&owner));
//!
//! ring.remove_node(owner.as_str())?;
//! assert_ne!(ring.lookup("user:42")?, owner);
//! # Ok::<(), Error>(())
//! ```

pub mod error;
pub mod node;
pub mod partitioner;
pub mod ring;
pub mod token;
pub mod topology;
pub mod vnode;

pub use error::{Error, Result};
pub use node::NodeId;
pub use partitioner::Partitioner;
pub use ring::{HashRing, RingBuilder, RingSnapshot};
pub use token::Token;
pub use topology::Topology;
pub use vnode::VirtualNode;
