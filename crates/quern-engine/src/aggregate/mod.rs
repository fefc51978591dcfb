//! Aggregate functions and the protocol for defining new ones.
//!
//! Aggregates come in two tiers. The base tier is the [`Aggregate`]
//! trait: a state machine that is fed one input per row and finalized
//! into a value. Any type implementing it works in grouped aggregation
//! and in window frames, where the engine folds the frame's rows from
//! scratch.
//!
//! The second tier is [`AssociativeAggregate`]: aggregates whose states
//! can be merged with `combine`, where combining is associative and a
//! freshly constructed state acts as the identity. These earn an
//! O(log n) fast path in window evaluation, because their states can be
//! precombined in a segment tree and any frame answered by merging a
//! few tree nodes.
//!
//! [`AggregateExpr`] packages an aggregate with its input expression
//! for use in [`GroupBy`](crate::relations::GroupBy) and
//! [`Window`](crate::relations::Window); the constructors in this
//! module ([`sum`], [`count`], [`mean`], and friends) cover the
//! built-ins. User-defined aggregates plug in through
//! [`AggregateExpr::associative`] and [`AggregateExpr::general`].

use std::marker::PhantomData;

use quern_core::Value;

use crate::error::{EngineError, EngineResult};
use crate::expr::{lit, KeyFn};
use crate::row::Row;
use crate::window::segment_tree::{FrameIndex, SegmentTree};
use crate::window::{Frame, FrameBound};

pub mod builtins;
pub mod navigation;
pub(crate) mod ranking;

pub(crate) use ranking::RankKind;

/// An aggregate computation: fed one input per row, finalized into a
/// value.
///
/// Implementations must be well-defined on empty input: `finalize` on a
/// state that was never stepped yields the aggregate's empty result
/// (zero for counts and sums, null for most others).
///
/// Stepping is infallible; aggregates are expected to ignore inputs
/// they cannot use (the numeric built-ins skip nulls and non-numeric
/// values) rather than fail mid-fold.
pub trait Aggregate: Send {
    /// Folds one input value into the state.
    fn step(&mut self, input: &Value);

    /// Computes the aggregate result from the current state.
    ///
    /// Takes `&self`: window evaluation finalizes intermediate states
    /// more than once.
    fn finalize(&self) -> Value;
}

/// An aggregate whose states merge associatively.
///
/// # Contract
///
/// For states `a`, `b`, `c` built from input runs `A`, `B`, `C`:
///
/// - **Merge**: `a.combine(&b)` must leave `a` equal to the state built
///   from the concatenated run `AB`
/// - **Associativity**: combining `(ab)c` and `a(bc)` must agree
/// - **Identity**: `Default::default()` is the state of the empty run,
///   and combining with it changes nothing
///
/// Commutativity is *not* required: combines always happen in input
/// order, so order-sensitive aggregates like
/// [`First`](navigation::First) qualify.
pub trait AssociativeAggregate: Aggregate + Default {
    /// Merges another state into this one; `other` is the state of the
    /// input run immediately after this one's.
    fn combine(&mut self, other: &Self);
}

/// An aggregate bound to its input expression, ready for grouped or
/// windowed evaluation.
pub struct AggregateExpr {
    pub(crate) input: Option<KeyFn>,
    pub(crate) kind: AggregateKind,
    /// Navigation functions (lead/lag) pin their own single-row frame,
    /// overriding the window's.
    pub(crate) frame: Option<Frame>,
}

pub(crate) enum AggregateKind {
    /// Associative tier: eligible for segment-tree indexing.
    Associative(Box<dyn AssociativeSeed>),
    /// General tier: each frame or group is folded from scratch.
    Fold(Box<dyn Fn() -> Box<dyn Aggregate> + Send>),
    /// Ranking functions, computed from the window's ordering rather
    /// than an input expression.
    Ranking(RankKind),
}

/// Type-erased factory for one associative aggregate type.
pub(crate) trait AssociativeSeed: Send {
    /// A fresh identity state for direct folding.
    fn state(&self) -> Box<dyn Aggregate>;

    /// A segment tree whose leaves are states stepped with `inputs`.
    fn index(&self, inputs: &[Value]) -> Box<dyn FrameIndex>;
}

struct Seed<A> {
    marker: PhantomData<fn() -> A>,
}

impl<A: AssociativeAggregate + Send + 'static> AssociativeSeed for Seed<A> {
    fn state(&self) -> Box<dyn Aggregate> {
        Box::new(A::default())
    }

    fn index(&self, inputs: &[Value]) -> Box<dyn FrameIndex> {
        Box::new(SegmentTree::<A>::build(inputs))
    }
}

impl AggregateExpr {
    /// Wraps an associative aggregate type over an input expression.
    ///
    /// The engine will index frames of this aggregate with a segment
    /// tree; the type must honor the [`AssociativeAggregate`] contract
    /// or windowed results will be wrong.
    #[must_use]
    pub fn associative<A>(input: KeyFn) -> Self
    where
        A: AssociativeAggregate + Send + 'static,
    {
        Self {
            input: Some(input),
            kind: AggregateKind::Associative(Box::new(Seed::<A> { marker: PhantomData })),
            frame: None,
        }
    }

    /// Wraps a general aggregate over an input expression.
    ///
    /// `factory` builds a fresh state per group or frame. No algebraic
    /// requirements beyond the [`Aggregate`] trait; frames are folded
    /// row by row.
    #[must_use]
    pub fn general<A, F>(factory: F, input: KeyFn) -> Self
    where
        A: Aggregate + 'static,
        F: Fn() -> A + Send + 'static,
    {
        Self {
            input: Some(input),
            kind: AggregateKind::Fold(Box::new(move || Box::new(factory()))),
            frame: None,
        }
    }

    fn navigation<A, F>(factory: F, input: KeyFn, frame: Frame) -> Self
    where
        A: Aggregate + 'static,
        F: Fn() -> A + Send + 'static,
    {
        Self {
            input: Some(input),
            kind: AggregateKind::Fold(Box::new(move || Box::new(factory()))),
            frame: Some(frame),
        }
    }

    const fn ranking(kind: RankKind) -> Self {
        Self { input: None, kind: AggregateKind::Ranking(kind), frame: None }
    }

    /// A fresh state for folding a whole group, for aggregates that
    /// support grouped (frameless) evaluation.
    ///
    /// # Errors
    ///
    /// Ranking and navigation functions are only defined relative to a
    /// window's ordering and frame; using them in grouped aggregation
    /// is reported as [`EngineError::InvalidAggregate`].
    pub(crate) fn group_state(&self, name: &str) -> EngineResult<Box<dyn Aggregate>> {
        if self.frame.is_some() {
            return Err(EngineError::InvalidAggregate(format!(
                "{name}: navigation functions require a window"
            )));
        }
        match &self.kind {
            AggregateKind::Associative(seed) => Ok(seed.state()),
            AggregateKind::Fold(factory) => Ok(factory()),
            AggregateKind::Ranking(_) => Err(EngineError::InvalidAggregate(format!(
                "{name}: ranking functions require a window"
            ))),
        }
    }

    /// Evaluates the input expression against a row.
    ///
    /// Expressions without an input (ranking, `count_star`) see null.
    pub(crate) fn eval_input(&self, row: &Row) -> EngineResult<Value> {
        match &self.input {
            Some(input) => input(row),
            None => Ok(Value::Null),
        }
    }
}

/// Sum of non-null numeric inputs; `0` on empty input.
///
/// Integer inputs keep integer sums (widening to float if they
/// overflow); any float input makes the sum a float.
#[must_use]
pub fn sum(input: KeyFn) -> AggregateExpr {
    AggregateExpr::associative::<builtins::Sum>(input)
}

/// Count of non-null inputs; `0` on empty input.
#[must_use]
pub fn count(input: KeyFn) -> AggregateExpr {
    AggregateExpr::associative::<builtins::Count>(input)
}

/// Count of all rows, nulls included.
#[must_use]
pub fn count_star() -> AggregateExpr {
    AggregateExpr::associative::<builtins::Count>(lit(1i64))
}

/// Arithmetic mean of non-null numeric inputs; null on empty input.
#[must_use]
pub fn mean(input: KeyFn) -> AggregateExpr {
    AggregateExpr::associative::<builtins::Mean>(input)
}

/// Smallest non-null input under the value ordering; null on empty.
#[must_use]
pub fn min(input: KeyFn) -> AggregateExpr {
    AggregateExpr::associative::<builtins::Min>(input)
}

/// Largest non-null input under the value ordering; null on empty.
#[must_use]
pub fn max(input: KeyFn) -> AggregateExpr {
    AggregateExpr::associative::<builtins::Max>(input)
}

/// First non-null input in frame order; null if there is none.
#[must_use]
pub fn first_value(input: KeyFn) -> AggregateExpr {
    AggregateExpr::associative::<navigation::First>(input)
}

/// Last non-null input in frame order; null if there is none.
#[must_use]
pub fn last_value(input: KeyFn) -> AggregateExpr {
    AggregateExpr::associative::<navigation::Last>(input)
}

/// The `n`-th input of the frame, 1-based, nulls included; null if the
/// frame is shorter than `n` (or `n` is 0).
#[must_use]
pub fn nth_value(input: KeyFn, n: usize) -> AggregateExpr {
    AggregateExpr::general(move || navigation::Nth::new(n), input)
}

/// The input `offset` rows after the current row in its partition, or
/// `default` if that runs off the partition.
///
/// Only meaningful in a window; the window's frame is ignored in favor
/// of the single target row.
#[must_use]
pub fn lead(input: KeyFn, offset: usize, default: Value) -> AggregateExpr {
    AggregateExpr::navigation(
        move || navigation::Shift::new(default.clone()),
        input,
        Frame::Rows {
            start: FrameBound::Following(offset),
            end: FrameBound::Following(offset),
        },
    )
}

/// The input `offset` rows before the current row in its partition, or
/// `default` if that runs off the partition.
///
/// Only meaningful in a window; the window's frame is ignored in favor
/// of the single target row.
#[must_use]
pub fn lag(input: KeyFn, offset: usize, default: Value) -> AggregateExpr {
    AggregateExpr::navigation(
        move || navigation::Shift::new(default.clone()),
        input,
        Frame::Rows {
            start: FrameBound::Preceding(offset),
            end: FrameBound::Preceding(offset),
        },
    )
}

/// Position of the row within its partition's ordering, starting at 1.
#[must_use]
pub fn row_number() -> AggregateExpr {
    AggregateExpr::ranking(RankKind::RowNumber)
}

/// Rank with gaps: peers share a rank, and the next distinct value
/// jumps past them.
#[must_use]
pub fn rank() -> AggregateExpr {
    AggregateExpr::ranking(RankKind::Rank)
}

/// Rank without gaps: peers share a rank and the next distinct value
/// takes the next integer.
#[must_use]
pub fn dense_rank() -> AggregateExpr {
    AggregateExpr::ranking(RankKind::DenseRank)
}

/// Sample variance (denominator `n - 1`); null with fewer than two
/// non-null numeric inputs.
#[must_use]
pub fn variance(input: KeyFn) -> AggregateExpr {
    AggregateExpr::associative::<builtins::SampleVariance>(input)
}

/// Population variance (denominator `n`); null on empty input.
#[must_use]
pub fn variance_pop(input: KeyFn) -> AggregateExpr {
    AggregateExpr::associative::<builtins::PopulationVariance>(input)
}

/// Sample standard deviation; null with fewer than two non-null
/// numeric inputs.
#[must_use]
pub fn stddev(input: KeyFn) -> AggregateExpr {
    AggregateExpr::associative::<builtins::SampleStdDev>(input)
}

/// Population standard deviation; null on empty input.
#[must_use]
pub fn stddev_pop(input: KeyFn) -> AggregateExpr {
    AggregateExpr::associative::<builtins::PopulationStdDev>(input)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::expr::col;

    /// Product of non-null integer inputs, as a user-defined
    /// associative aggregate would be written.
    #[derive(Debug, Default)]
    struct Product {
        acc: Option<i64>,
    }

    impl Aggregate for Product {
        fn step(&mut self, input: &Value) {
            if let Value::Int(i) = input {
                self.acc = Some(self.acc.map_or(*i, |acc| acc * i));
            }
        }

        fn finalize(&self) -> Value {
            self.acc.map_or(Value::Null, Value::Int)
        }
    }

    impl AssociativeAggregate for Product {
        fn combine(&mut self, other: &Self) {
            if let Some(b) = other.acc {
                self.acc = Some(self.acc.map_or(b, |a| a * b));
            }
        }
    }

    fn stepped(values: &[Value]) -> Product {
        let mut state = Product::default();
        for v in values {
            state.step(v);
        }
        state
    }

    #[test]
    fn combine_matches_concatenated_fold() {
        let run_a = [Value::Int(2), Value::Null, Value::Int(3)];
        let run_b = [Value::Int(5)];

        let mut combined = stepped(&run_a);
        combined.combine(&stepped(&run_b));

        let mut all: Vec<Value> = run_a.to_vec();
        all.extend(run_b.to_vec());
        assert_eq!(combined.finalize(), stepped(&all).finalize());
        assert_eq!(combined.finalize(), Value::Int(30));
    }

    #[test]
    fn identity_state_is_a_no_op() {
        let mut state = stepped(&[Value::Int(7)]);
        state.combine(&Product::default());
        assert_eq!(state.finalize(), Value::Int(7));

        let mut identity = Product::default();
        identity.combine(&stepped(&[Value::Int(7)]));
        assert_eq!(identity.finalize(), Value::Int(7));

        assert_eq!(Product::default().finalize(), Value::Null);
    }

    #[test]
    fn associativity_of_combine() {
        let a = stepped(&[Value::Int(2)]);
        let b = stepped(&[Value::Int(3)]);
        let c = stepped(&[Value::Int(4)]);

        let mut left = {
            let mut ab = stepped(&[Value::Int(2)]);
            ab.combine(&b);
            ab
        };
        left.combine(&c);

        let mut right = a;
        right.combine(&{
            let mut bc = stepped(&[Value::Int(3)]);
            bc.combine(&c);
            bc
        });

        assert_eq!(left.finalize(), right.finalize());
    }

    #[test]
    fn user_aggregates_plug_into_expressions() {
        let assoc = AggregateExpr::associative::<Product>(col("x"));
        assert!(assoc.group_state("product").is_ok());

        let general = AggregateExpr::general(Product::default, col("x"));
        let mut state = general.group_state("product").unwrap();
        state.step(&Value::Int(6));
        assert_eq!(state.finalize(), Value::Int(6));
    }

    #[test]
    fn ranking_and_navigation_need_windows() {
        let Err(err) = rank().group_state("rank") else {
            panic!("rank must be rejected outside a window");
        };
        assert!(err.to_string().contains("window"));

        let Err(err) = lead(col("x"), 1, Value::Null).group_state("lead") else {
            panic!("lead must be rejected outside a window");
        };
        assert!(err.to_string().contains("window"));
    }

    #[test]
    fn count_star_counts_every_row() {
        let expr = count_star();
        let row = Row::from_pairs([("x", Value::Null)]).unwrap();
        let mut state = expr.group_state("count").unwrap();
        state.step(&expr.eval_input(&row).unwrap());
        state.step(&expr.eval_input(&row).unwrap());
        assert_eq!(state.finalize(), Value::Int(2));
    }
}
