//! Window frames: which rows around the current row an aggregate sees.
//!
//! A [`Frame`] is a pair of [`FrameBound`]s. `Rows` frames count physical
//! rows on either side of the current row; `Range` frames select rows
//! whose single order-key value lies within an offset of the current
//! row's value. Bounds that can never describe a valid window (start
//! after end, negative range offsets) are rejected when the frame is
//! built, not at evaluation time.
//!
//! Frame bounds are clamped to the partition: a frame that hangs off
//! either edge shrinks, and one that lies entirely outside is empty.

use std::cmp::Ordering;
use std::ops::Range;

use quern_core::{cmp_values, CoreError, Value};

use crate::error::{EngineError, EngineResult};

/// One edge of a window frame.
///
/// `T` is `usize` for row-counted frames and [`Value`] for range frames.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameBound<T> {
    /// From the start of the partition.
    UnboundedPreceding,
    /// A fixed offset before the current row.
    Preceding(T),
    /// The current row itself. In range frames this covers the current
    /// row's peers: every row sharing its order-key value.
    CurrentRow,
    /// A fixed offset after the current row.
    Following(T),
    /// Through the end of the partition.
    UnboundedFollowing,
}

/// A validated window frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Frame measured in physical rows before and after the current row.
    Rows {
        /// First row of the frame.
        start: FrameBound<usize>,
        /// Last row of the frame (inclusive).
        end: FrameBound<usize>,
    },
    /// Frame measured in order-key values. Requires the window to order
    /// by exactly one ascending numeric key.
    Range {
        /// Lowest order-key value of the frame.
        start: FrameBound<Value>,
        /// Highest order-key value of the frame (inclusive).
        end: FrameBound<Value>,
    },
}

impl Frame {
    /// Builds a row-counted frame.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidFrame`] if the start bound cannot
    /// precede the end bound.
    pub fn rows(start: FrameBound<usize>, end: FrameBound<usize>) -> EngineResult<Self> {
        let frame = Self::Rows { start, end };
        frame.validate()?;
        Ok(frame)
    }

    /// Builds a range frame over order-key values.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidFrame`] if an offset is negative or
    /// non-numeric, or the start bound cannot precede the end bound.
    pub fn range(start: FrameBound<Value>, end: FrameBound<Value>) -> EngineResult<Self> {
        let frame = Self::Range { start, end };
        frame.validate()?;
        Ok(frame)
    }

    /// The frame used when a window declares an ordering but no frame:
    /// everything from the partition start through the current row.
    #[must_use]
    pub(crate) fn default_ordered() -> Self {
        Self::Rows { start: FrameBound::UnboundedPreceding, end: FrameBound::CurrentRow }
    }

    /// The frame used when a window declares no ordering and no frame:
    /// the whole partition.
    #[must_use]
    pub(crate) fn default_unordered() -> Self {
        Self::Rows { start: FrameBound::UnboundedPreceding, end: FrameBound::UnboundedFollowing }
    }

    /// Returns `true` for range frames, which need a single ascending
    /// order key.
    #[must_use]
    pub const fn is_range(&self) -> bool {
        matches!(self, Self::Range { .. })
    }

    /// Checks that the bounds can describe a window.
    ///
    /// Frames built through [`Frame::rows`] and [`Frame::range`] have
    /// already passed this; it runs again when a window is built so
    /// hand-assembled frames get the same treatment.
    pub(crate) fn validate(&self) -> EngineResult<()> {
        match self {
            Self::Rows { start, end } => {
                check_edges(start, end)?;
                if rows_rank(start) > rows_rank(end) {
                    return Err(EngineError::InvalidFrame(format!(
                        "frame start {start:?} is after frame end {end:?}"
                    )));
                }
                Ok(())
            }
            Self::Range { start, end } => {
                check_edges(start, end)?;
                let start_offset = range_rank(start)?;
                let end_offset = range_rank(end)?;
                if start_offset > end_offset {
                    return Err(EngineError::InvalidFrame(format!(
                        "frame start {start:?} is after frame end {end:?}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Computes the frame for the row at `pos` within a partition of
    /// `len` rows, clamped to `0..len`.
    ///
    /// `order_values` holds the partition's order-key values in sorted
    /// order; only range frames read it.
    ///
    /// # Errors
    ///
    /// Range frames fail if the current row's order-key value is null or
    /// not numeric.
    pub(crate) fn bounds(
        &self,
        pos: usize,
        len: usize,
        order_values: &[Value],
    ) -> EngineResult<Range<usize>> {
        match self {
            Self::Rows { start, end } => Ok(rows_bounds(start, end, pos, len)),
            Self::Range { start, end } => range_bounds(start, end, pos, order_values),
        }
    }
}

/// Rejects the two bound placements that can never make sense.
fn check_edges<T: std::fmt::Debug>(
    start: &FrameBound<T>,
    end: &FrameBound<T>,
) -> EngineResult<()> {
    if matches!(start, FrameBound::UnboundedFollowing) {
        return Err(EngineError::InvalidFrame(
            "frame cannot start at unbounded following".to_string(),
        ));
    }
    if matches!(end, FrameBound::UnboundedPreceding) {
        return Err(EngineError::InvalidFrame(
            "frame cannot end at unbounded preceding".to_string(),
        ));
    }
    Ok(())
}

/// Signed position of a row-counted bound relative to the current row.
fn rows_rank(bound: &FrameBound<usize>) -> i128 {
    match bound {
        FrameBound::UnboundedPreceding => i128::MIN,
        FrameBound::Preceding(n) => -(*n as i128),
        FrameBound::CurrentRow => 0,
        FrameBound::Following(n) => *n as i128,
        FrameBound::UnboundedFollowing => i128::MAX,
    }
}

/// Signed offset of a range bound, validating the offset value.
fn range_rank(bound: &FrameBound<Value>) -> EngineResult<f64> {
    let checked = |value: &Value, sign: f64| -> EngineResult<f64> {
        match value.as_number() {
            Some(n) if n >= 0.0 => Ok(sign * n),
            _ => Err(EngineError::InvalidFrame(format!(
                "range frame offsets must be non-negative numbers, got {value:?}"
            ))),
        }
    };
    match bound {
        FrameBound::UnboundedPreceding => Ok(f64::NEG_INFINITY),
        FrameBound::Preceding(value) => checked(value, -1.0),
        FrameBound::CurrentRow => Ok(0.0),
        FrameBound::Following(value) => checked(value, 1.0),
        FrameBound::UnboundedFollowing => Ok(f64::INFINITY),
    }
}

fn rows_bounds(
    start: &FrameBound<usize>,
    end: &FrameBound<usize>,
    pos: usize,
    len: usize,
) -> Range<usize> {
    let len_i = len as i128;
    let pos_i = pos as i128;
    let lo = match start {
        FrameBound::UnboundedPreceding => 0,
        FrameBound::Preceding(n) => pos_i - *n as i128,
        FrameBound::CurrentRow => pos_i,
        FrameBound::Following(n) => pos_i + *n as i128,
        FrameBound::UnboundedFollowing => len_i,
    };
    // End bounds are inclusive; the returned range is half-open.
    let hi = match end {
        FrameBound::UnboundedPreceding => 0,
        FrameBound::Preceding(n) => pos_i - *n as i128 + 1,
        FrameBound::CurrentRow => pos_i + 1,
        FrameBound::Following(n) => pos_i + *n as i128 + 1,
        FrameBound::UnboundedFollowing => len_i,
    };
    let lo = lo.clamp(0, len_i) as usize;
    let hi = hi.clamp(0, len_i) as usize;
    if lo > hi {
        lo..lo
    } else {
        lo..hi
    }
}

fn range_bounds(
    start: &FrameBound<Value>,
    end: &FrameBound<Value>,
    pos: usize,
    order_values: &[Value],
) -> EngineResult<Range<usize>> {
    let len = order_values.len();
    let current = &order_values[pos];
    if current.as_number().is_none() {
        return Err(CoreError::type_mismatch_with_value(
            "numeric order key",
            current.type_name(),
            format!("{current:?}"),
        )
        .into());
    }
    let lo = match start {
        FrameBound::UnboundedPreceding => 0,
        FrameBound::Preceding(offset) => {
            bisect_left(order_values, &offset_value(current, offset, false)?)
        }
        FrameBound::CurrentRow => bisect_left(order_values, current),
        FrameBound::Following(offset) => {
            bisect_left(order_values, &offset_value(current, offset, true)?)
        }
        FrameBound::UnboundedFollowing => len,
    };
    let hi = match end {
        FrameBound::UnboundedPreceding => 0,
        FrameBound::Preceding(offset) => {
            bisect_right(order_values, &offset_value(current, offset, false)?)
        }
        FrameBound::CurrentRow => bisect_right(order_values, current),
        FrameBound::Following(offset) => {
            bisect_right(order_values, &offset_value(current, offset, true)?)
        }
        FrameBound::UnboundedFollowing => len,
    };
    Ok(if lo > hi { lo..lo } else { lo..hi })
}

/// Shifts the current order-key value by a frame offset.
///
/// Integer keys with integer offsets stay integers (saturating at the
/// i64 edges); any float involved widens the target to a float.
fn offset_value(current: &Value, offset: &Value, forward: bool) -> EngineResult<Value> {
    if let (Value::Int(c), Value::Int(o)) = (current, offset) {
        let shifted = if forward { c.saturating_add(*o) } else { c.saturating_sub(*o) };
        return Ok(Value::Int(shifted));
    }
    let c = current.as_number().ok_or_else(|| {
        CoreError::type_mismatch_with_value(
            "numeric order key",
            current.type_name(),
            format!("{current:?}"),
        )
    })?;
    let o = offset.as_number().ok_or_else(|| {
        CoreError::type_mismatch_with_value(
            "numeric frame offset",
            offset.type_name(),
            format!("{offset:?}"),
        )
    })?;
    Ok(Value::Float(if forward { c + o } else { c - o }))
}

/// First index whose value is not less than `target`.
fn bisect_left(values: &[Value], target: &Value) -> usize {
    values.partition_point(|v| cmp_values(v, target) == Ordering::Less)
}

/// First index whose value is greater than `target`.
fn bisect_right(values: &[Value], target: &Value) -> usize {
    values.partition_point(|v| cmp_values(v, target) != Ordering::Greater)
}
