//! Segment trees over aggregate states.
//!
//! A [`SegmentTree`] indexes one partition's aggregate inputs so that
//! any contiguous frame can be aggregated in O(log n) combines instead
//! of folding the frame from scratch. It requires the aggregate to be
//! associative with an identity (the [`AssociativeAggregate`] contract):
//! internal nodes hold the combination of their children, and unused
//! leaves in the padded tree hold identity states that combine as
//! no-ops.
//!
//! The tree is a complete binary tree in a flat vector: the root lives
//! at index 1, the children of node `i` at `2 * i` and `2 * i + 1`, and
//! the leaves start at `size`, the leaf count rounded up to a power of
//! two.

use std::ops::Range;

use quern_core::Value;

use crate::aggregate::AssociativeAggregate;

/// Answers aggregate queries over contiguous index ranges.
///
/// This is the type-erased face of [`SegmentTree`] that window
/// evaluation dispatches through.
pub(crate) trait FrameIndex: Send {
    /// Aggregates the leaves in `range` and finalizes the result.
    fn query(&self, range: Range<usize>) -> Value;
}

/// A static segment tree of aggregate states.
///
/// Built once per partition from the aggregate's per-row inputs; never
/// updated afterwards.
#[derive(Debug)]
pub struct SegmentTree<A> {
    /// Nodes in heap layout. Index 0 is unused; leaves occupy
    /// `size..size + len`.
    nodes: Vec<A>,
    /// Number of real leaves.
    len: usize,
    /// Leaf capacity: `len` rounded up to a power of two, at least 1.
    size: usize,
}

impl<A: AssociativeAggregate> SegmentTree<A> {
    /// Builds a tree whose leaves are fresh states stepped with one
    /// input each.
    #[must_use]
    pub fn build(leaves: &[Value]) -> Self {
        let len = leaves.len();
        let size = len.next_power_of_two().max(1);
        let mut nodes = Vec::with_capacity(2 * size);
        nodes.resize_with(2 * size, A::default);

        for (i, value) in leaves.iter().enumerate() {
            nodes[size + i].step(value);
        }
        for i in (1..size).rev() {
            // Children are at 2i and 2i + 1; combine left then right to
            // preserve input order for non-commutative aggregates.
            let (parents, children) = nodes.split_at_mut(2 * i);
            parents[i].combine(&children[0]);
            parents[i].combine(&children[1]);
        }

        Self { nodes, len, size }
    }

    /// Number of real leaves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the tree has no leaves.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Aggregates the leaves in `range` and finalizes the result.
    ///
    /// Combines O(log n) precomputed nodes, visiting them left to right
    /// so order-sensitive aggregates see inputs in leaf order. An empty
    /// range finalizes the identity state.
    #[must_use]
    pub fn query(&self, range: Range<usize>) -> Value {
        let mut lo = range.start.min(self.len) + self.size;
        let mut hi = range.end.min(self.len) + self.size;

        let mut acc = A::default();
        let mut right_nodes = Vec::new();
        while lo < hi {
            if lo & 1 == 1 {
                acc.combine(&self.nodes[lo]);
                lo += 1;
            }
            if hi & 1 == 1 {
                hi -= 1;
                right_nodes.push(&self.nodes[hi]);
            }
            lo >>= 1;
            hi >>= 1;
        }
        // Nodes collected from the right edge were pushed outside-in.
        for node in right_nodes.iter().rev() {
            acc.combine(node);
        }
        acc.finalize()
    }
}

impl<A: AssociativeAggregate + Send> FrameIndex for SegmentTree<A> {
    fn query(&self, range: Range<usize>) -> Value {
        SegmentTree::query(self, range)
    }
}
