//! Hash ring data structure.
//!
//! The current state lives in an immutable [`RingSnapshot`] behind an
//! `Arc`. Lookups clone the `Arc` under a short read lock and search without
//! holding any lock. Writers are serialized, build the next snapshot off to
//! the side and publish it with one pointer swap, so a half-applied
//! mutation is never visible.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::error::{Error, Result};
use crate::node::NodeId;
use crate::partitioner::{Crc32Partitioner, Partitioner};
use crate::ring::builder::RingBuilder;
use crate::ring::snapshot::RingSnapshot;

/// Replica count used by [`HashRing::add`] unless configured otherwise.
pub const DEFAULT_VNODES: usize = 256;

/// Consistent hash ring mapping keys to node identifiers.
///
/// Nodes and keys are hashed into the same token space by the ring's
/// [`Partitioner`]. A key belongs to the first virtual node clockwise from
/// its token. Adding a node only takes keys from the arcs its new points
/// split; removing a node only hands its keys to the next points clockwise.
pub struct HashRing<P: Partitioner = Crc32Partitioner> {
    current: RwLock<Arc<RingSnapshot<P>>>,
    writer: Mutex<()>,
    default_vnodes: usize,
}

impl HashRing {
    /// Creates an empty ring with the CRC-32 partitioner and
    /// [`DEFAULT_VNODES`] replicas per node.
    pub fn new() -> Self {
        Self::with_partitioner(Crc32Partitioner)
    }

    /// Starts a [`RingBuilder`] with the default partitioner.
    pub fn builder() -> RingBuilder {
        RingBuilder::new()
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Partitioner> HashRing<P> {
    /// Creates an empty ring placing tokens with `partitioner`.
    pub fn with_partitioner(partitioner: P) -> Self {
        Self::from_parts(partitioner, DEFAULT_VNODES)
    }

    pub(crate) fn from_parts(partitioner: P, default_vnodes: usize) -> Self {
        Self {
            current: RwLock::new(Arc::new(RingSnapshot::empty(Arc::new(partitioner)))),
            writer: Mutex::new(()),
            default_vnodes,
        }
    }

    /// Current state of the ring.
    ///
    /// The snapshot is immutable; later mutations of the ring do not affect
    /// it. Use it to resolve a batch of keys against one consistent view.
    pub fn snapshot(&self) -> Arc<RingSnapshot<P>> {
        Arc::clone(&self.current.read())
    }

    /// Adds a node with the ring's default replica count.
    pub fn add(&self, node: &str) -> Result<()> {
        self.add_node(node, self.default_vnodes)
    }

    /// Adds a node represented by `vnodes` virtual nodes.
    ///
    /// Re-adding a node with the same replica count is a no-op. Re-adding it
    /// with a different count replaces its points in one step.
    ///
    /// # Arguments
    /// * `node` - Node identifier, must not be empty
    /// * `vnodes` - Number of points placed for the node, must be positive
    ///
    /// # Performance
    /// - **Time**: O(R log R) to place R replicas, plus O(P) to copy the
    ///   P existing points into the next snapshot
    /// - **Space**: O(P + R) for the next snapshot
    ///
    /// # Example
    /// ```rust
    /// use corelib::HashRing;
    ///
    /// let ring = HashRing::new();
    /// ring.add_node("cache-1", 100)?;
    /// assert_eq!(ring.token_count(), 100);
    ///
    /// ring.add_node("cache-1", 40)?;
    /// assert_eq!(ring.token_count(), 40);
    /// # Ok::<(), corelib::Error>(())
    /// ```
    pub fn add_node(&self, node: &str, vnodes: usize) -> Result<()> {
        let node_id = NodeId::new(node)?;
        if vnodes == 0 {
            return Err(Error::invalid(format!(
                "replica count for node {node_id} must be positive"
            )));
        }

        let _writer = self.writer.lock();
        let current = self.snapshot();
        match current.vnodes_of(node) {
            Some(existing) if existing == vnodes => {
                debug!(node = %node_id, vnodes, "node already present");
                return Ok(());
            }
            Some(existing) => {
                debug!(node = %node_id, from = existing, to = vnodes, "changing replica count");
            }
            None => {}
        }

        let next = current.with_node(node_id.clone(), vnodes);
        debug!(
            node = %node_id,
            vnodes,
            tokens = next.token_count(),
            version = next.version(),
            "added node to ring"
        );
        self.publish(next);
        Ok(())
    }

    /// Removes a node and all its virtual nodes.
    ///
    /// Keys on the removed points fall to the next point clockwise; no other
    /// key changes owner. Fails with [`Error::NotFound`] when the node is not
    /// a member; the ring is left unchanged in that case.
    ///
    /// # Performance
    /// - **Time**: O(P) to filter the point sequence
    pub fn remove_node(&self, node: &str) -> Result<()> {
        let node_id = NodeId::new(node)?;

        let _writer = self.writer.lock();
        let current = self.snapshot();
        if !current.contains(node) {
            return Err(Error::NotFound(node_id));
        }

        let next = current.without_node(&node_id);
        debug!(
            node = %node_id,
            tokens = next.token_count(),
            version = next.version(),
            "removed node from ring"
        );
        self.publish(next);
        Ok(())
    }

    fn publish(&self, next: RingSnapshot<P>) {
        *self.current.write() = Arc::new(next);
    }

    /// Returns the node responsible for `key`.
    ///
    /// Fails with [`Error::EmptyRing`] when no node is registered.
    ///
    /// # Performance
    /// - **Time**: O(log P) binary search over the P points
    /// - **Locking**: the read lock is held only to clone the snapshot `Arc`
    ///
    /// # Example
    /// ```rust
    /// use corelib::HashRing;
    ///
    /// let ring = HashRing::new();
    /// ring.add("cache-1")?;
    /// ring.add("cache-2")?;
    ///
    /// let owner = ring.lookup("user:42")?;
    /// assert_eq!(owner, ring.lookup("user:42")?);
    /// # Ok::<(), corelib::Error>(())
    /// ```
    pub fn lookup(&self, key: impl AsRef<[u8]>) -> Result<NodeId> {
        self.snapshot().lookup(key)
    }

    /// Returns up to `n` distinct nodes clockwise from `key`, primary first.
    ///
    /// See [`RingSnapshot::lookup_n`].
    pub fn lookup_n(&self, key: impl AsRef<[u8]>, n: usize) -> Result<Vec<NodeId>> {
        self.snapshot().lookup_n(key, n)
    }

    /// Token the given key hashes to.
    pub fn position(&self, key: impl AsRef<[u8]>) -> P::TokenType {
        self.snapshot().position(key)
    }

    /// Registered node identifiers, sorted.
    pub fn members(&self) -> Vec<NodeId> {
        self.snapshot().members()
    }

    /// True if `node` is a member.
    pub fn contains(&self, node: &str) -> bool {
        self.snapshot().contains(node)
    }

    /// Replica count the node was added with, `None` for non-members.
    pub fn vnodes_of(&self, node: &str) -> Option<usize> {
        self.snapshot().vnodes_of(node)
    }

    /// Number of members.
    pub fn node_count(&self) -> usize {
        self.snapshot().node_count()
    }

    /// Number of points on the ring.
    ///
    /// Equals the sum of replica counts unless replicas collided.
    pub fn token_count(&self) -> usize {
        self.snapshot().token_count()
    }

    /// True if the ring has no members.
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Number of published mutations. No-op re-adds and failed calls
    /// leave it unchanged.
    pub fn version(&self) -> u64 {
        self.snapshot().version()
    }

    /// Replica count used by [`add()`](Self::add).
    pub fn default_vnodes(&self) -> usize {
        self.default_vnodes
    }

    /// All `(token, node)` pairs in ring order (for debugging).
    pub fn tokens(&self) -> Vec<(P::TokenType, NodeId)> {
        self.snapshot()
            .points()
            .iter()
            .map(|p| (p.token, p.node_id.clone()))
            .collect()
    }

    /// Name of the hash function, e.g. `"Crc32Partitioner"`.
    pub fn partitioner_name(&self) -> &'static str {
        self.snapshot().partitioner().name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_mutation_keeps_state() {
        let ring = HashRing::new();
        ring.add_node("a", 4).unwrap();
        let before = ring.snapshot();

        assert!(matches!(ring.add_node("", 4), Err(Error::InvalidArgument(_))));
        assert!(matches!(ring.add_node("b", 0), Err(Error::InvalidArgument(_))));
        assert_eq!(
            ring.remove_node("b"),
            Err(Error::NotFound(NodeId::new("b").unwrap()))
        );

        let after = ring.snapshot();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.version(), 1);
    }

    #[test]
    fn readd_same_count_does_not_publish() {
        let ring = HashRing::new();
        ring.add_node("a", 4).unwrap();
        let before = ring.snapshot();
        ring.add_node("a", 4).unwrap();
        assert!(Arc::ptr_eq(&before, &ring.snapshot()));
    }

    #[test]
    fn old_snapshot_survives_mutation() {
        let ring = HashRing::new();
        ring.add_node("a", 4).unwrap();
        let old = ring.snapshot();
        ring.remove_node("a").unwrap();

        assert_eq!(old.lookup("key").unwrap(), "a");
        assert_eq!(ring.lookup("key"), Err(Error::EmptyRing));
    }

    #[test]
    fn default_vnodes() {
        let ring = HashRing::new();
        ring.add("a").unwrap();
        assert_eq!(ring.token_count(), DEFAULT_VNODES);
        assert_eq!(ring.default_vnodes(), DEFAULT_VNODES);
    }

    #[test]
    fn ring_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HashRing>();
        assert_send_sync::<HashRing<crate::partitioner::Xxh3Partitioner>>();
    }
}
