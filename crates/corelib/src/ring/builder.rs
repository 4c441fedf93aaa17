//! Builder for [`HashRing`].
//!
//! The partitioner and the default replica count are fixed when the ring is
//! built: every stored token depends on them, so changing either means
//! building a new ring.

use crate::error::{Error, Result};
use crate::partitioner::{Crc32Partitioner, Partitioner};
use crate::ring::ring::{HashRing, DEFAULT_VNODES};

/// Ring builder.
///
/// # Example
/// ```rust
/// use corelib::partitioner::Xxh3Partitioner;
/// use corelib::RingBuilder;
///
/// let ring = RingBuilder::new()
///     .with_partitioner(Xxh3Partitioner::new())
///     .with_vnodes(160)
///     .add_nodes(["cache-1", "cache-2"])
///     .add_node_with_vnodes("cache-3", 320)
///     .build()?;
/// assert_eq!(ring.token_count(), 640);
/// # Ok::<(), corelib::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct RingBuilder<P: Partitioner = Crc32Partitioner> {
    partitioner: P,
    vnodes: usize,
    /// Initial members; `None` means "use the default replica count".
    nodes: Vec<(String, Option<usize>)>,
}

impl RingBuilder {
    /// Create new ring builder (CRC-32, [`DEFAULT_VNODES`] replicas).
    pub fn new() -> Self {
        Self {
            partitioner: Crc32Partitioner,
            vnodes: DEFAULT_VNODES,
            nodes: Vec::new(),
        }
    }
}

impl Default for RingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Partitioner> RingBuilder<P> {
    /// Transform the builder into one with a different partitioner.
    pub fn with_partitioner<Q: Partitioner>(self, partitioner: Q) -> RingBuilder<Q> {
        RingBuilder {
            partitioner,
            vnodes: self.vnodes,
            nodes: self.nodes,
        }
    }

    /// Default replica count, used for nodes added without an explicit one.
    pub fn with_vnodes(mut self, vnodes: usize) -> Self {
        self.vnodes = vnodes;
        self
    }

    /// Register an initial member with the default replica count.
    pub fn add_node(mut self, node: impl Into<String>) -> Self {
        self.nodes.push((node.into(), None));
        self
    }

    /// Register an initial member with its own replica count.
    pub fn add_node_with_vnodes(mut self, node: impl Into<String>, vnodes: usize) -> Self {
        self.nodes.push((node.into(), Some(vnodes)));
        self
    }

    /// Register several initial members with the default replica count.
    pub fn add_nodes<I, S>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nodes
            .extend(nodes.into_iter().map(|node| (node.into(), None)));
        self
    }

    /// Build the ring and register the initial members.
    ///
    /// Fails with [`Error::InvalidArgument`] for a zero default replica
    /// count, an empty node id or a zero per-node count.
    pub fn build(self) -> Result<HashRing<P>> {
        if self.vnodes == 0 {
            return Err(Error::invalid("default replica count must be positive"));
        }

        let ring = HashRing::from_parts(self.partitioner, self.vnodes);
        for (node, vnodes) in self.nodes {
            ring.add_node(&node, vnodes.unwrap_or(self.vnodes))?;
        }
        Ok(ring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partitioner::Xxh3Partitioner;

    #[test]
    fn rejects_zero_default() {
        let res = RingBuilder::new().with_vnodes(0).add_node("a").build();
        assert!(matches!(res, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn rejects_bad_member() {
        let res = RingBuilder::new().add_node("a").add_node("").build();
        assert!(matches!(res, Err(Error::InvalidArgument(_))));

        let res = RingBuilder::new().add_node_with_vnodes("a", 0).build();
        assert!(matches!(res, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn custom_partitioner() {
        let ring = RingBuilder::new()
            .with_partitioner(Xxh3Partitioner::new())
            .with_vnodes(8)
            .add_nodes(["a", "b"])
            .build()
            .unwrap();
        assert_eq!(ring.partitioner_name(), "Xxh3Partitioner");
        assert_eq!(ring.token_count(), 16);
    }
}
