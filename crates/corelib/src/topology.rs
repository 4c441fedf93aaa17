//! Ring topology analysis.
//!
//! Read-only views over a [`RingSnapshot`]: how much of the hash space each
//! node owns, and which token ranges. Ownership is what turns into load, and
//! the ranges are what has to move when membership changes.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::node::NodeId;
use crate::partitioner::Partitioner;
use crate::ring::RingSnapshot;
use crate::token::Token;

/// Arc of the ring, `(start, end]`.
///
/// Keys whose token falls strictly after `start` and at or before `end`
/// (walking clockwise, possibly across zero) belong to the owner of `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenRange<T: Token> {
    pub start: T,
    pub end: T,
}

impl<T: Token> TokenRange<T> {
    /// Whether `token` falls in this arc.
    pub fn contains(&self, token: T) -> bool {
        if self.start == self.end {
            // Sole owner of the whole ring.
            return true;
        }
        let offset = self.start.distance_to(&token);
        !offset.is_zero() && offset <= self.start.distance_to(&self.end)
    }

    /// Number of tokens in the arc.
    pub fn span(&self) -> u128 {
        if self.start == self.end {
            T::ring_size()
        } else {
            u128::from(self.start.distance_to(&self.end).as_u64())
        }
    }
}

/// Share of the ring held by one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ownership {
    pub node: NodeId,
    /// Virtual nodes on the ring.
    pub vnodes: usize,
    /// Fraction of the hash space, in `[0, 1]`.
    pub share: f64,
}

/// Ownership view over one snapshot.
#[derive(Debug, Clone)]
pub struct Topology<T: Token> {
    ranges: BTreeMap<NodeId, Vec<TokenRange<T>>>,
    vnodes: BTreeMap<NodeId, usize>,
}

impl<T: Token> Topology<T> {
    /// Computes the arcs owned by every node.
    ///
    /// A point owns the arc from the previous point (exclusive) to itself
    /// (inclusive); the first point also owns the wrap-around arc. Points
    /// sharing a token with a lexically smaller node own nothing.
    pub fn of<P>(snapshot: &RingSnapshot<P>) -> Self
    where
        P: Partitioner<TokenType = T>,
    {
        let mut ranges: BTreeMap<NodeId, Vec<TokenRange<T>>> = BTreeMap::new();
        let mut vnodes: BTreeMap<NodeId, usize> = BTreeMap::new();
        for member in snapshot.members() {
            ranges.insert(member.clone(), Vec::new());
            vnodes.insert(member, 0);
        }

        let points = snapshot.points();
        let (first, last) = match (points.first(), points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Self { ranges, vnodes },
        };

        for point in points {
            *vnodes.entry(point.node_id.clone()).or_default() += 1;
        }

        if first.token == last.token {
            // Every point on one token: the tie-break winner owns it all.
            ranges.entry(first.node_id.clone()).or_default().push(TokenRange {
                start: first.token,
                end: first.token,
            });
            return Self { ranges, vnodes };
        }

        let mut prev = last.token;
        for point in points {
            if point.token != prev {
                ranges
                    .entry(point.node_id.clone())
                    .or_default()
                    .push(TokenRange {
                        start: prev,
                        end: point.token,
                    });
            }
            prev = point.token;
        }

        Self { ranges, vnodes }
    }

    /// Arcs owned by `node`, in ring order. `None` for non-members.
    pub fn ranges(&self, node: &str) -> Option<&[TokenRange<T>]> {
        self.ranges.get(node).map(Vec::as_slice)
    }

    /// Per-node share of the hash space, sorted by node.
    ///
    /// Shares over all nodes sum to 1 on a non-empty ring.
    pub fn ownership(&self) -> Vec<Ownership> {
        let ring_size = T::ring_size() as f64;
        self.ranges
            .iter()
            .map(|(node, ranges)| {
                let owned: u128 = ranges.iter().map(TokenRange::span).sum();
                Ownership {
                    node: node.clone(),
                    vnodes: self.vnodes.get(node).copied().unwrap_or_default(),
                    share: owned as f64 / ring_size,
                }
            })
            .collect()
    }
}
