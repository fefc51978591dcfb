//! Navigation aggregates: values picked by position within a frame.
//!
//! [`First`] and [`Last`] are associative (taking the first non-null
//! of two runs is associative with the never-seen state as identity),
//! so they ride the segment-tree fast path. [`Nth`] depends on
//! absolute position within the frame and [`Shift`] on a frame pinned
//! relative to the current row, so both fold.

use quern_core::Value;

use super::{Aggregate, AssociativeAggregate};

/// First non-null input in frame order; null if there is none.
#[derive(Debug, Default, Clone)]
pub struct First {
    value: Option<Value>,
}

impl Aggregate for First {
    fn step(&mut self, input: &Value) {
        if self.value.is_none() && !input.is_null() {
            self.value = Some(input.clone());
        }
    }

    fn finalize(&self) -> Value {
        self.value.clone().unwrap_or(Value::Null)
    }
}

impl AssociativeAggregate for First {
    fn combine(&mut self, other: &Self) {
        if self.value.is_none() {
            self.value.clone_from(&other.value);
        }
    }
}

/// Last non-null input in frame order; null if there is none.
#[derive(Debug, Default, Clone)]
pub struct Last {
    value: Option<Value>,
}

impl Aggregate for Last {
    fn step(&mut self, input: &Value) {
        if !input.is_null() {
            self.value = Some(input.clone());
        }
    }

    fn finalize(&self) -> Value {
        self.value.clone().unwrap_or(Value::Null)
    }
}

impl AssociativeAggregate for Last {
    fn combine(&mut self, other: &Self) {
        if other.value.is_some() {
            self.value.clone_from(&other.value);
        }
    }
}

/// The `n`-th input of the frame (1-based), counting nulls.
///
/// Null if the frame has fewer than `n` inputs; `n = 0` never matches.
#[derive(Debug, Clone)]
pub struct Nth {
    n: usize,
    seen: usize,
    value: Option<Value>,
}

impl Nth {
    /// Picks the `n`-th input, 1-based.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self { n, seen: 0, value: None }
    }
}

impl Aggregate for Nth {
    fn step(&mut self, input: &Value) {
        self.seen += 1;
        if self.seen == self.n {
            self.value = Some(input.clone());
        }
    }

    fn finalize(&self) -> Value {
        self.value.clone().unwrap_or(Value::Null)
    }
}

/// Backing state for `lead` and `lag`.
///
/// The expression pins a single-row frame at the lead/lag offset, so
/// this either sees the target row's input (possibly null, which it
/// reports as-is) or nothing, in which case it falls back to the
/// default.
#[derive(Debug, Clone)]
pub struct Shift {
    default: Value,
    value: Option<Value>,
}

impl Shift {
    /// Uses `default` when the target row falls outside the partition.
    #[must_use]
    pub fn new(default: Value) -> Self {
        Self { default, value: None }
    }
}

impl Aggregate for Shift {
    fn step(&mut self, input: &Value) {
        self.value = Some(input.clone());
    }

    fn finalize(&self) -> Value {
        self.value.clone().unwrap_or_else(|| self.default.clone())
    }
}
