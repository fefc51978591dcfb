//! Built-in associative aggregates.
//!
//! All of these merge with an associative `combine` and default to
//! their identity state, so window frames over them are answered
//! through segment trees. The numeric aggregates skip null and
//! non-numeric inputs; `Min` and `Max` skip only nulls and order any
//! comparable values.

use std::cmp::Ordering;

use quern_core::{cmp_values, Value};

use super::{Aggregate, AssociativeAggregate};

/// Running sum. Empty input sums to `Int(0)`.
///
/// Integer inputs are summed exactly as integers; if the running
/// integer sum would overflow it widens to a float, and any float
/// input switches the sum to floating point for good.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sum {
    acc: Acc,
}

#[derive(Debug, Default, Clone, Copy)]
enum Acc {
    #[default]
    Empty,
    Int(i64),
    Float(f64),
}

impl Sum {
    fn add_int(&mut self, i: i64) {
        self.acc = match self.acc {
            Acc::Empty => Acc::Int(i),
            Acc::Int(a) => match a.checked_add(i) {
                Some(total) => Acc::Int(total),
                None => Acc::Float(a as f64 + i as f64),
            },
            Acc::Float(a) => Acc::Float(a + i as f64),
        };
    }

    fn add_float(&mut self, f: f64) {
        self.acc = match self.acc {
            Acc::Empty => Acc::Float(f),
            Acc::Int(a) => Acc::Float(a as f64 + f),
            Acc::Float(a) => Acc::Float(a + f),
        };
    }
}

impl Aggregate for Sum {
    fn step(&mut self, input: &Value) {
        match input {
            Value::Int(i) => self.add_int(*i),
            Value::Float(f) => self.add_float(*f),
            _ => {}
        }
    }

    fn finalize(&self) -> Value {
        match self.acc {
            Acc::Empty => Value::Int(0),
            Acc::Int(total) => Value::Int(total),
            Acc::Float(total) => Value::Float(total),
        }
    }
}

impl AssociativeAggregate for Sum {
    fn combine(&mut self, other: &Self) {
        match other.acc {
            Acc::Empty => {}
            Acc::Int(b) => self.add_int(b),
            Acc::Float(b) => self.add_float(b),
        }
    }
}

/// Count of non-null inputs. Empty input counts to `Int(0)`.
///
/// [`count_star`](super::count_star) feeds this a constant to count
/// every row instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct Count {
    count: i64,
}

impl Aggregate for Count {
    fn step(&mut self, input: &Value) {
        if !input.is_null() {
            self.count += 1;
        }
    }

    fn finalize(&self) -> Value {
        Value::Int(self.count)
    }
}

impl AssociativeAggregate for Count {
    fn combine(&mut self, other: &Self) {
        self.count += other.count;
    }
}

/// Arithmetic mean of non-null numeric inputs; null on empty input.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mean {
    sum: f64,
    count: i64,
}

impl Aggregate for Mean {
    fn step(&mut self, input: &Value) {
        if let Some(n) = input.as_number() {
            self.sum += n;
            self.count += 1;
        }
    }

    fn finalize(&self) -> Value {
        if self.count == 0 {
            Value::Null
        } else {
            Value::Float(self.sum / self.count as f64)
        }
    }
}

impl AssociativeAggregate for Mean {
    fn combine(&mut self, other: &Self) {
        self.sum += other.sum;
        self.count += other.count;
    }
}

/// Smallest non-null input under [`cmp_values`]; null on empty input.
#[derive(Debug, Default, Clone)]
pub struct Min {
    current: Option<Value>,
}

impl Aggregate for Min {
    fn step(&mut self, input: &Value) {
        if input.is_null() {
            return;
        }
        let replace = match &self.current {
            None => true,
            Some(current) => cmp_values(input, current) == Ordering::Less,
        };
        if replace {
            self.current = Some(input.clone());
        }
    }

    fn finalize(&self) -> Value {
        self.current.clone().unwrap_or(Value::Null)
    }
}

impl AssociativeAggregate for Min {
    fn combine(&mut self, other: &Self) {
        if let Some(v) = &other.current {
            self.step(v);
        }
    }
}

/// Largest non-null input under [`cmp_values`]; null on empty input.
#[derive(Debug, Default, Clone)]
pub struct Max {
    current: Option<Value>,
}

impl Aggregate for Max {
    fn step(&mut self, input: &Value) {
        if input.is_null() {
            return;
        }
        let replace = match &self.current {
            None => true,
            Some(current) => cmp_values(input, current) == Ordering::Greater,
        };
        if replace {
            self.current = Some(input.clone());
        }
    }

    fn finalize(&self) -> Value {
        self.current.clone().unwrap_or(Value::Null)
    }
}

impl AssociativeAggregate for Max {
    fn combine(&mut self, other: &Self) {
        if let Some(v) = &other.current {
            self.step(v);
        }
    }
}

/// Variance and standard deviation over non-null numeric inputs.
///
/// Tracks count, sum, and sum of squares, which add under `combine`.
/// `DDOF` is the delta degrees of freedom (1 for sample statistics, 0
/// for population); `SQRT` turns the variance into a standard
/// deviation at finalize. Yields null when fewer than `DDOF + 1`
/// inputs were seen.
#[derive(Debug, Default, Clone, Copy)]
pub struct Moments<const DDOF: i64, const SQRT: bool> {
    count: i64,
    sum: f64,
    sum_sq: f64,
}

impl<const DDOF: i64, const SQRT: bool> Aggregate for Moments<DDOF, SQRT> {
    fn step(&mut self, input: &Value) {
        if let Some(n) = input.as_number() {
            self.count += 1;
            self.sum += n;
            self.sum_sq += n * n;
        }
    }

    fn finalize(&self) -> Value {
        let denom = self.count - DDOF;
        if self.count == 0 || denom <= 0 {
            return Value::Null;
        }
        let mean = self.sum / self.count as f64;
        // Rounding can push the difference slightly negative.
        let variance = ((self.sum_sq - self.sum * mean) / denom as f64).max(0.0);
        Value::Float(if SQRT { variance.sqrt() } else { variance })
    }
}

impl<const DDOF: i64, const SQRT: bool> AssociativeAggregate for Moments<DDOF, SQRT> {
    fn combine(&mut self, other: &Self) {
        self.count += other.count;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
    }
}

/// Sample variance: denominator `n - 1`.
pub type SampleVariance = Moments<1, false>;
/// Population variance: denominator `n`.
pub type PopulationVariance = Moments<0, false>;
/// Sample standard deviation.
pub type SampleStdDev = Moments<1, true>;
/// Population standard deviation.
pub type PopulationStdDev = Moments<0, true>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fold<A: Aggregate + Default>(values: &[Value]) -> Value {
        let mut state = A::default();
        for v in values {
            state.step(v);
        }
        state.finalize()
    }

    #[test]
    fn sum_of_nothing_is_zero() {
        assert_eq!(fold::<Sum>(&[]), Value::Int(0));
        assert_eq!(fold::<Sum>(&[Value::Null]), Value::Int(0));
    }

    #[test]
    fn sum_keeps_integers_integral() {
        let values = [Value::Int(1), Value::Null, Value::Int(2)];
        assert_eq!(fold::<Sum>(&values), Value::Int(3));
    }

    #[test]
    fn sum_widens_on_float_input() {
        let values = [Value::Int(1), Value::Float(0.5)];
        assert_eq!(fold::<Sum>(&values), Value::Float(1.5));
    }

    #[test]
    fn sum_widens_on_overflow() {
        let values = [Value::Int(i64::MAX), Value::Int(1)];
        match fold::<Sum>(&values) {
            Value::Float(f) => assert!(f > i64::MAX as f64 - 2.0),
            other => panic!("expected float, got {other:?}"),
        }
    }

    #[test]
    fn sum_ignores_non_numeric() {
        let values = [Value::Int(4), Value::from("x"), Value::Bool(true)];
        assert_eq!(fold::<Sum>(&values), Value::Int(4));
    }

    #[test]
    fn count_skips_nulls() {
        let values = [Value::Int(1), Value::Null, Value::from("a")];
        assert_eq!(fold::<Count>(&values), Value::Int(2));
        assert_eq!(fold::<Count>(&[]), Value::Int(0));
    }

    #[test]
    fn mean_of_nothing_is_null() {
        assert_eq!(fold::<Mean>(&[]), Value::Null);
        assert_eq!(fold::<Mean>(&[Value::Null]), Value::Null);
    }

    #[test]
    fn mean_averages_numerics() {
        let values = [Value::Int(1), Value::Int(2), Value::Null, Value::Float(3.0)];
        assert_eq!(fold::<Mean>(&values), Value::Float(2.0));
    }

    #[test]
    fn min_max_order_any_comparable_values() {
        let words = [Value::from("pear"), Value::from("apple"), Value::Null];
        assert_eq!(fold::<Min>(&words), Value::from("apple"));
        assert_eq!(fold::<Max>(&words), Value::from("pear"));

        let mixed = [Value::Int(2), Value::Float(1.5), Value::Int(3)];
        assert_eq!(fold::<Min>(&mixed), Value::Float(1.5));
        assert_eq!(fold::<Max>(&mixed), Value::Int(3));
    }

    #[test]
    fn min_max_empty_is_null() {
        assert_eq!(fold::<Min>(&[]), Value::Null);
        assert_eq!(fold::<Max>(&[Value::Null]), Value::Null);
    }

    #[test]
    fn variance_known_values() {
        let values: Vec<Value> = [1.0, 2.0, 3.0, 4.0].map(Value::Float).to_vec();

        match fold::<SampleVariance>(&values) {
            Value::Float(v) => assert!((v - 5.0 / 3.0).abs() < 1e-9),
            other => panic!("expected float, got {other:?}"),
        }
        match fold::<PopulationVariance>(&values) {
            Value::Float(v) => assert!((v - 1.25).abs() < 1e-9),
            other => panic!("expected float, got {other:?}"),
        }
        match fold::<PopulationStdDev>(&values) {
            Value::Float(v) => assert!((v - 1.25f64.sqrt()).abs() < 1e-9),
            other => panic!("expected float, got {other:?}"),
        }
    }

    #[test]
    fn sample_variance_needs_two_inputs() {
        assert_eq!(fold::<SampleVariance>(&[Value::Int(5)]), Value::Null);
        assert_eq!(fold::<SampleVariance>(&[]), Value::Null);
        assert_eq!(fold::<PopulationVariance>(&[]), Value::Null);
        // Population variance of a single point is zero
        assert_eq!(fold::<PopulationVariance>(&[Value::Int(5)]), Value::Float(0.0));
    }

    #[test]
    fn combine_matches_single_fold() {
        let left = [Value::Int(1), Value::Int(2)];
        let right = [Value::Int(3), Value::Int(4)];
        let all = [Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)];

        let mut a = Sum::default();
        left.iter().for_each(|v| a.step(v));
        let mut b = Sum::default();
        right.iter().for_each(|v| b.step(v));
        a.combine(&b);
        assert_eq!(a.finalize(), fold::<Sum>(&all));

        let mut a = SampleVariance::default();
        left.iter().for_each(|v| a.step(v));
        let mut b = SampleVariance::default();
        right.iter().for_each(|v| b.step(v));
        a.combine(&b);
        assert_eq!(a.finalize(), fold::<SampleVariance>(&all));
    }
}
