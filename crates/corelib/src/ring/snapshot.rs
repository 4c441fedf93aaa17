//! Immutable ring state.
//!
//! A snapshot is never modified once published. Mutations build a new
//! snapshot from the current one, so readers holding an older snapshot keep
//! a consistent view for as long as they hold it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::node::NodeId;
use crate::partitioner::Partitioner;
use crate::vnode::VirtualNode;

/// Point-in-time view of a [`HashRing`](crate::ring::HashRing).
pub struct RingSnapshot<P: Partitioner> {
    partitioner: Arc<P>,
    /// Sorted by `(token, node)`, no duplicate pairs.
    points: Vec<VirtualNode<P::TokenType>>,
    /// Member -> replica count it was added with.
    members: BTreeMap<NodeId, usize>,
    version: u64,
}

impl<P: Partitioner> Clone for RingSnapshot<P> {
    fn clone(&self) -> Self {
        Self {
            partitioner: Arc::clone(&self.partitioner),
            points: self.points.clone(),
            members: self.members.clone(),
            version: self.version,
        }
    }
}

impl<P: Partitioner> fmt::Debug for RingSnapshot<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingSnapshot")
            .field("partitioner", &self.partitioner.name())
            .field("members", &self.members)
            .field("points", &self.points.len())
            .field("version", &self.version)
            .finish()
    }
}

impl<P: Partitioner> RingSnapshot<P> {
    pub(crate) fn empty(partitioner: Arc<P>) -> Self {
        Self {
            partitioner,
            points: Vec::new(),
            members: BTreeMap::new(),
            version: 0,
        }
    }

    /// Token the given key hashes to.
    pub fn position(&self, key: impl AsRef<[u8]>) -> P::TokenType {
        self.partitioner.partition(key.as_ref())
    }

    /// Returns the node responsible for `key`.
    ///
    /// The owner is the first point clockwise from the key's position: the
    /// smallest token `>=` the key's token, wrapping to the smallest token on
    /// the ring when the key sorts above every point.
    pub fn lookup(&self, key: impl AsRef<[u8]>) -> Result<NodeId> {
        let token = self.position(key);
        self.lookup_token(token).cloned()
    }

    /// Returns the node owning `token`.
    pub fn lookup_token(&self, token: P::TokenType) -> Result<&NodeId> {
        let idx = self.successor(token).ok_or(Error::EmptyRing)?;
        let owner = &self.points[idx].node_id;
        trace!(%token, node = %owner, "lookup");
        Ok(owner)
    }

    /// Returns up to `n` distinct nodes, walking clockwise from the key.
    ///
    /// The first entry is always the node returned by
    /// [`lookup()`](Self::lookup). Fewer than `n` nodes are returned when
    /// the ring has fewer members.
    pub fn lookup_n(&self, key: impl AsRef<[u8]>, n: usize) -> Result<Vec<NodeId>> {
        if n == 0 {
            return Err(Error::invalid("number of nodes must be positive"));
        }
        let token = self.position(key);
        let start = self.successor(token).ok_or(Error::EmptyRing)?;

        let wanted = n.min(self.members.len());
        let mut nodes: Vec<NodeId> = Vec::with_capacity(wanted);
        let (head, tail) = self.points.split_at(start);
        for point in tail.iter().chain(head) {
            if !nodes.contains(&point.node_id) {
                nodes.push(point.node_id.clone());
                if nodes.len() == wanted {
                    break;
                }
            }
        }
        Ok(nodes)
    }

    /// Index of the first point at or after `token`, wrapping to 0.
    fn successor(&self, token: P::TokenType) -> Option<usize> {
        if self.points.is_empty() {
            return None;
        }
        let idx = self.points.partition_point(|p| p.token < token);
        Some(if idx == self.points.len() { 0 } else { idx })
    }

    /// Registered node identifiers, sorted.
    pub fn members(&self) -> Vec<NodeId> {
        self.members.keys().cloned().collect()
    }

    pub fn contains(&self, node: &str) -> bool {
        self.members.contains_key(node)
    }

    /// Replica count the node was added with, if it is a member.
    pub fn vnodes_of(&self, node: &str) -> Option<usize> {
        self.members.get(node).copied()
    }

    pub fn node_count(&self) -> usize {
        self.members.len()
    }

    pub fn token_count(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of mutations applied since the ring was created.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// All virtual nodes in ring order.
    pub fn points(&self) -> &[VirtualNode<P::TokenType>] {
        &self.points
    }

    pub fn partitioner(&self) -> &P {
        &self.partitioner
    }

    /// Next snapshot, with `node` holding exactly `vnodes` replicas.
    ///
    /// Any points the node already had are dropped first.
    pub(crate) fn with_node(&self, node_id: NodeId, vnodes: usize) -> Self {
        let mut fresh: Vec<_> = (0..vnodes)
            .map(|i| VirtualNode::from_index(&*self.partitioner, &node_id, i))
            .collect();
        fresh.sort_unstable();
        // Two replicas of one node hashing to the same token.
        fresh.dedup();

        let mut points = Vec::with_capacity(self.points.len() + fresh.len());
        points.extend(self.points.iter().filter(|p| p.node_id != node_id).cloned());
        points.extend(fresh);
        points.sort_unstable();

        let collisions = points
            .windows(2)
            .filter(|w| {
                w[0].token == w[1].token
                    && w[0].node_id != w[1].node_id
                    && (w[0].node_id == node_id || w[1].node_id == node_id)
            })
            .count();
        if collisions > 0 {
            warn!(node = %node_id, collisions, "token collision, lowest node id owns the shared token");
        }

        let mut members = self.members.clone();
        members.insert(node_id, vnodes);

        Self {
            partitioner: Arc::clone(&self.partitioner),
            points,
            members,
            version: self.version + 1,
        }
    }

    /// Next snapshot, with every point of `node` filtered out.
    pub(crate) fn without_node(&self, node_id: &NodeId) -> Self {
        let points = self
            .points
            .iter()
            .filter(|p| &p.node_id != node_id)
            .cloned()
            .collect();
        let mut members = self.members.clone();
        members.remove(node_id);

        Self {
            partitioner: Arc::clone(&self.partitioner),
            points,
            members,
            version: self.version + 1,
        }
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

    fn snapshot() -> RingSnapshot<Crc32Partitioner> {
        RingSnapshot::empty(Arc::new(Crc32Partitioner))
    }

    #[test]
    fn points_stay_sorted() {
        let snap = snapshot()
            .with_node(id("a"), 16)
            .with_node(id("b"), 16)
            .with_node(id("c"), 16);
        assert_eq!(snap.token_count(), 48);
        assert!(snap.points().windows(2).all(|w| w[0] < w[1]));
        assert_eq!(snap.version(), 3);
    }

    #[test]
    fn readd_replaces_points() {
        let snap = snapshot().with_node(id("a"), 8).with_node(id("a"), 3);
        assert_eq!(snap.token_count(), 3);
        assert_eq!(snap.vnodes_of("a"), Some(3));
        assert_eq!(snap.node_count(), 1);
    }

    #[test]
    fn without_node_filters_points() {
        let snap = snapshot().with_node(id("a"), 4).with_node(id("b"), 4);
        let next = snap.without_node(&id("a"));
        assert_eq!(next.token_count(), 4);
        assert!(next.points().iter().all(|p| p.node_id == "b"));
        assert_eq!(next.members(), vec![id("b")]);
        // The old snapshot is untouched.
        assert_eq!(snap.token_count(), 8);
    }

    #[test]
    fn lookup_token_wraps() {
        let snap = snapshot().with_node(id("a"), 4).with_node(id("b"), 4);
        let first = snap.points()[0].clone();
        let last = snap.points().last().unwrap().token;

        assert_eq!(snap.lookup_token(first.token).unwrap(), &first.node_id);
        assert_eq!(snap.lookup_token(Token32(0)).unwrap(), &first.node_id);
        if last.0 < u32::MAX {
            assert_eq!(snap.lookup_token(Token32(last.0 + 1)).unwrap(), &first.node_id);
        }
    }

    #[test]
    fn empty_snapshot() {
        let snap = snapshot();
        assert_eq!(snap.lookup("key"), Err(Error::EmptyRing));
        assert_eq!(snap.lookup_n("key", 2), Err(Error::EmptyRing));
        assert!(snap.is_empty());
    }

    #[test]
    fn lookup_n_distinct_primary_first() {
        let snap = snapshot()
            .with_node(id("a"), 8)
            .with_node(id("b"), 8)
            .with_node(id("c"), 8);
        for key in ["k1", "k2", "k3", "k4"] {
            let nodes = snap.lookup_n(key, 5).unwrap();
            assert_eq!(nodes.len(), 3);
            assert_eq!(nodes[0], snap.lookup(key).unwrap());
            let mut sorted = nodes.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), 3);
        }
        assert!(matches!(snap.lookup_n("k", 0), Err(Error::InvalidArgument(_))));
    }
}
