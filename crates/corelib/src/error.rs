//! Error types for the core library.

use crate::node::NodeId;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
///
/// None of them is fatal to the ring: a failed operation leaves the last
/// published state in place.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Bad replica count, empty node identifier or similar.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Node is not a member of the ring.
    #[error("Node not found: {0}")]
    NotFound(NodeId),

    /// Lookup against a ring with no nodes.
    #[error("Ring has no nodes")]
    EmptyRing,
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}
