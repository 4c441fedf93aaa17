//! Virtual node abstractions.
//!
//! # Virtual Nodes (VNodes) Concept
//!
//! Each physical node is represented by several tokens on the ring instead of
//! one. With a single token per node, hash outputs for a handful of nodes are
//! far from evenly spaced and some nodes end up owning most of the keys.
//! Spreading `R` replicas per node smooths the per-node share.
//!
//! - **Lookup**: O(log n) where n = total vnodes
//! - **Add/remove**: O(R log R) to place the replicas, plus a copy of the
//!   point sequence
//!
//! Small clusters need more replicas: with 100 or more per node the busiest
//! node stays well under twice its ideal share.

use std::cmp::Ordering;
use std::fmt;

use crate::node::NodeId;
use crate::partitioner::Partitioner;
use crate::token::Token;

/// A virtual node on the hash ring.
///
/// # Invariants
///
/// - Ordered by token first, then by node identifier. Distinct nodes on the
///   same token therefore sort lexically and the smallest identifier wins
///   lookups for that token.
/// - A ring never holds the same `(token, node)` pair twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualNode<T: Token> {
    /// Token position on the ring: the hash of `"node:index"`.
    pub token: T,

    /// The physical node that owns this virtual node.
    pub node_id: NodeId,
}

impl<T: Token> VirtualNode<T> {
    /// Create a new virtual node.
    ///
    /// # Arguments
    /// * `token` - The token position on the ring
    /// * `node_id` - The physical node that owns this vnode
    ///
    /// # Example
    /// ```rust
    /// use corelib::token::Token32;
    /// use corelib::{NodeId, VirtualNode};
    ///
    /// let vnode = VirtualNode::new(Token32(42), NodeId::new("cache-1").unwrap());
    /// assert_eq!(vnode.token(), Token32(42));
    /// ```
    #[inline]
    pub fn new(token: T, node_id: NodeId) -> Self {
        Self { token, node_id }
    }

    /// Create the `vnode_index`-th virtual node of `node_id`.
    ///
    /// The replica is placed by hashing `"node_id:vnode_index"`. The index is
    /// decimal, so the last `:` always separates the two parts and distinct
    /// `(node, index)` pairs never share a hash input, even for identifiers
    /// that contain `:` themselves (`host:port`).
    ///
    /// # Arguments
    /// * `partitioner` - Hash function placing the replica
    /// * `node_id` - The physical node ID
    /// * `vnode_index` - The index of this vnode (0, 1, 2, ...)
    ///
    /// # Performance
    /// - **Time**: O(k) for a formatted key of k bytes, formatting plus one hash
    /// - **Space**: O(k) temporary for the formatted key
    ///
    /// # Example
    /// ```rust
    /// use corelib::partitioner::{Crc32Partitioner, Partitioner};
    /// use corelib::{NodeId, VirtualNode};
    ///
    /// let node = NodeId::new("10.0.0.1:11211").unwrap();
    /// let vnode = VirtualNode::from_index(&Crc32Partitioner, &node, 0);
    /// assert_eq!(vnode.token(), Crc32Partitioner.partition(b"10.0.0.1:11211:0"));
    /// ```
    pub fn from_index<P>(partitioner: &P, node_id: &NodeId, vnode_index: usize) -> Self
    where
        P: Partitioner<TokenType = T>,
    {
        let vnode_key = format!("{}:{}", node_id, vnode_index);
        Self::new(partitioner.partition(vnode_key.as_bytes()), node_id.clone())
    }

    /// Get the token position.
    #[inline]
    pub fn token(&self) -> T {
        self.token
    }

    /// Get the owning physical node.
    #[inline]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }
}

impl<T: Token> PartialOrd for VirtualNode<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Token> Ord for VirtualNode<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.token
            .cmp(&other.token)
            .then_with(|| self.node_id.cmp(&other.node_id))
    }
}

impl<T: Token> fmt::Display for VirtualNode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VNode(token={}, node={})", self.token, self.node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partitioner::Crc32Partitioner;
    use crate::token::Token32;

    fn id(s: &str) -> NodeId {
        NodeId::new(s).unwrap()
    }

    #[test]
    fn test_vnode_from_index() {
        let node = id("node1");
        let vnode0 = VirtualNode::from_index(&Crc32Partitioner, &node, 0);
        let vnode1 = VirtualNode::from_index(&Crc32Partitioner, &node, 1);

        assert_ne!(vnode0.token(), vnode1.token());
        assert_eq!(vnode0.node_id(), vnode1.node_id());
        assert_eq!(vnode0.token(), Crc32Partitioner.partition(b"node1:0"));
    }

    #[test]
    fn test_vnode_ordering_breaks_ties_by_node() {
        let low = VirtualNode::new(Token32(100), id("b"));
        let tie_a = VirtualNode::new(Token32(200), id("a"));
        let tie_b = VirtualNode::new(Token32(200), id("b"));

        assert!(low < tie_a);
        assert!(tie_a < tie_b);

        let mut points = vec![tie_b.clone(), low.clone(), tie_a.clone()];
        points.sort();
        assert_eq!(points, vec![low, tie_a, tie_b]);
    }
}
