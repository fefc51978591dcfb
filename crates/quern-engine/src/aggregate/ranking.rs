//! Ranking functions, computed from a window's ordering.
//!
//! Unlike other aggregates, ranks are not folds over frame inputs:
//! they are positions in the partition's sort order, so the window
//! relation computes a whole partition's ranks in one pass over the
//! sorted order-key tuples.

use std::cmp::Ordering;

use quern_core::Value;

use crate::expr::{cmp_key_values, SortKey};

/// Which ranking function to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RankKind {
    /// 1, 2, 3, ... in sort order, ignoring ties.
    RowNumber,
    /// Peers share a rank; the next distinct value skips past them.
    Rank,
    /// Peers share a rank; the next distinct value takes the next
    /// integer.
    DenseRank,
}

/// Ranks every row of one sorted partition, 1-based.
///
/// `tuples` are the partition's order-key tuples in sorted order; two
/// adjacent rows are peers when their tuples compare equal under the
/// window's sort keys. With no order keys every row is a peer, so
/// `Rank` and `DenseRank` yield all ones while `RowNumber` still
/// counts.
pub(crate) fn compute_ranks(
    kind: RankKind,
    keys: &[SortKey],
    tuples: &[Vec<Value>],
) -> Vec<Value> {
    let mut out = Vec::with_capacity(tuples.len());
    let mut rank = 0_i64;
    let mut dense = 0_i64;
    for (i, tuple) in tuples.iter().enumerate() {
        let new_group =
            i == 0 || cmp_key_values(keys, &tuples[i - 1], tuple) != Ordering::Equal;
        let value = match kind {
            RankKind::RowNumber => i as i64 + 1,
            RankKind::Rank => {
                if new_group {
                    rank = i as i64 + 1;
                }
                rank
            }
            RankKind::DenseRank => {
                if new_group {
                    dense += 1;
                }
                dense
            }
        };
        out.push(Value::Int(value));
    }
    out
}
