//! Window definitions and the framing machinery behind windowed
//! aggregation.
//!
//! A [`WindowDef`] says how rows are split into partitions, how each
//! partition is ordered, and which [`Frame`] of rows each aggregate
//! sees around the current row. The
//! [`Window`](crate::relations::Window) relation pairs one definition
//! with any number of aggregate expressions.

mod frame;
pub(crate) mod segment_tree;

pub use frame::{Frame, FrameBound};
pub use segment_tree::SegmentTree;

use crate::expr::{KeyFn, SortKey};

/// Partitioning, ordering, and framing for a window.
///
/// Built fluently:
///
/// ```
/// use quern_engine::expr::{col, SortKey};
/// use quern_engine::window::{Frame, FrameBound, WindowDef};
///
/// let def = WindowDef::new()
///     .partition_by(vec![col("dept")])
///     .order_by(vec![SortKey::asc(col("salary"))])
///     .frame(Frame::rows(FrameBound::Preceding(1), FrameBound::Following(1)).unwrap());
/// ```
///
/// Without an explicit frame, an ordered window frames everything from
/// the partition start through the current row, and an unordered
/// window frames the whole partition.
#[derive(Default)]
pub struct WindowDef {
    pub(crate) partition_by: Vec<KeyFn>,
    pub(crate) order_by: Vec<SortKey>,
    pub(crate) frame: Option<Frame>,
}

impl WindowDef {
    /// An empty definition: one partition, no ordering, default frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits rows into partitions by these keys.
    #[must_use]
    pub fn partition_by(mut self, keys: Vec<KeyFn>) -> Self {
        self.partition_by = keys;
        self
    }

    /// Orders rows within each partition.
    #[must_use]
    pub fn order_by(mut self, keys: Vec<SortKey>) -> Self {
        self.order_by = keys;
        self
    }

    /// Sets an explicit frame.
    #[must_use]
    pub fn frame(mut self, frame: Frame) -> Self {
        self.frame = Some(frame);
        self
    }

    /// The frame aggregates will use: the explicit one, or the default
    /// implied by whether the window is ordered.
    pub(crate) fn effective_frame(&self) -> Frame {
        self.frame.clone().unwrap_or_else(|| {
            if self.order_by.is_empty() {
                Frame::default_unordered()
            } else {
                Frame::default_ordered()
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::expr::col;

    #[test]
    fn default_frame_depends_on_ordering() {
        let unordered = WindowDef::new();
        assert_eq!(unordered.effective_frame(), Frame::default_unordered());

        let ordered = WindowDef::new().order_by(vec![SortKey::asc(col("x"))]);
        assert_eq!(ordered.effective_frame(), Frame::default_ordered());
    }

    #[test]
    fn explicit_frame_wins() {
        let frame = Frame::rows(FrameBound::Preceding(2), FrameBound::CurrentRow).unwrap();
        let def = WindowDef::new()
            .order_by(vec![SortKey::asc(col("x"))])
            .frame(frame.clone());
        assert_eq!(def.effective_frame(), frame);
    }
}
