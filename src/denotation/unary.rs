//! Unary denotations: sets of values.
//!
//! Explicit denotations hold a concrete list (duplicates preserved) plus a
//! deduplicated set view. Infinite ones are symbolic:
//! - `Everything` (`*`)
//! - `Comparison`: `(> v)`, `(!= v)`, ...
//! - `Range`: a lower and an upper comparator bound, from `and`-merges
//! - `GenericDate`: every date matching the known components
//!
//! Infinite denotations can be tested for membership, merged and bounded,
//! but never enumerated.

use std::fmt;
use std::iter;

use hashbrown::HashSet;

use super::{Comparator, Processor};
use crate::execution::ExecutorConfig;
use crate::formula::{AggregateMode, MergeMode};
use crate::model::{Answer, DateValue, Value};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum UnaryDenotation {
    Explicit(ExplicitUnary),
    Everything,
    Comparison(Comparison),
    Range(Range),
    GenericDate(DateValue),
}

/// A concrete list of values with a set view for membership.
#[derive(Debug, Clone, Default)]
pub struct ExplicitUnary {
    values: Vec<Value>,
    set: HashSet<Value>,
}

/// `(<op> pivot)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    comparator: Comparator,
    pivot: Value,
    /// `None` for `!=`, which needs no ordering.
    processor: Option<Processor>,
    /// `!=` only admits values of the pivot's kind.
    type_checked: bool,
}

/// One end of a [`Range`].
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    pub value: Value,
    pub inclusive: bool,
}

/// Values strictly (or inclusively) between two bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    lower: Bound,
    upper: Bound,
    processor: Processor,
}

// ============================================================================
// Explicit
// ============================================================================

impl ExplicitUnary {
    pub fn new(values: Vec<Value>) -> Self {
        let set = values.iter().cloned().collect();
        Self { values, set }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn set(&self) -> &HashSet<Value> {
        &self.set
    }

    /// Number of entries, duplicates included.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of distinct values.
    pub fn unique_len(&self) -> usize {
        self.set.len()
    }

    pub fn contains(&self, v: &Value) -> bool {
        self.set.contains(v)
    }

    /// Distinct values in first-occurrence order.
    pub fn uniqued(&self) -> ExplicitUnary {
        let mut seen = HashSet::with_capacity(self.set.len());
        let values = self.values.iter().filter(|v| seen.insert(*v)).cloned().collect();
        ExplicitUnary { values, set: self.set.clone() }
    }

    /// Keep the values satisfying `keep`, preserving duplicates.
    pub fn try_retain<F>(&self, mut keep: F) -> Result<ExplicitUnary>
    where
        F: FnMut(&Value) -> Result<bool>,
    {
        let mut values = Vec::new();
        for v in &self.values {
            if keep(v)? {
                values.push(v.clone());
            }
        }
        Ok(ExplicitUnary::new(values))
    }

    fn intersect(&self, other: &ExplicitUnary) -> ExplicitUnary {
        let mut seen = HashSet::new();
        self.values
            .iter()
            .filter(|v| other.contains(v) && seen.insert(*v))
            .cloned()
            .collect()
    }

    fn union(&self, other: &ExplicitUnary) -> ExplicitUnary {
        let mut seen = HashSet::new();
        self.values
            .iter()
            .chain(&other.values)
            .filter(|v| seen.insert(*v))
            .cloned()
            .collect()
    }
}

impl PartialEq for ExplicitUnary {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl FromIterator<Value> for ExplicitUnary {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        ExplicitUnary::new(iter.into_iter().collect())
    }
}

// ============================================================================
// Comparison and Range
// ============================================================================

impl Comparison {
    pub fn new(comparator: Comparator, pivot: Value, config: &ExecutorConfig) -> Result<Self> {
        let processor = match comparator {
            Comparator::Ne => None,
            _ => Some(Processor::select(iter::once(&pivot), config.allow_string_comparison)?),
        };
        Ok(Self { comparator, pivot, processor, type_checked: config.neq_type_check })
    }

    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    pub fn pivot(&self) -> &Value {
        &self.pivot
    }

    pub fn contains(&self, v: &Value) -> Result<bool> {
        match self.processor {
            None => Ok(*v != self.pivot && (!self.type_checked || v.same_kind(&self.pivot))),
            Some(p) => Ok(self.comparator.holds(p.compare(v, &self.pivot)?)),
        }
    }

    /// (lower, upper) bounds, or `None` for `!=`.
    fn interval(&self) -> Option<Interval> {
        let processor = self.processor?;
        let bound = |inclusive| Some(Bound { value: self.pivot.clone(), inclusive });
        Some(match self.comparator {
            Comparator::Lt => (None, bound(false), processor),
            Comparator::Le => (None, bound(true), processor),
            Comparator::Gt => (bound(false), None, processor),
            Comparator::Ge => (bound(true), None, processor),
            Comparator::Ne => return None,
        })
    }
}

impl Range {
    pub fn lower(&self) -> &Bound {
        &self.lower
    }

    pub fn upper(&self) -> &Bound {
        &self.upper
    }

    pub fn contains(&self, v: &Value) -> Result<bool> {
        let above = self.processor.compare(v, &self.lower.value)?;
        let below = self.processor.compare(v, &self.upper.value)?;
        let lower_ok = if self.lower.inclusive { above.is_ge() } else { above.is_gt() };
        let upper_ok = if self.upper.inclusive { below.is_le() } else { below.is_lt() };
        Ok(lower_ok && upper_ok)
    }
}

impl UnaryDenotation {
    fn interval(&self) -> Option<Interval> {
        match self {
            UnaryDenotation::Comparison(c) => c.interval(),
            UnaryDenotation::Range(r) => {
                Some((Some(r.lower.clone()), Some(r.upper.clone()), r.processor))
            }
            _ => None,
        }
    }
}

type Interval = (Option<Bound>, Option<Bound>, Processor);

fn tighter(x: Option<Bound>, y: Option<Bound>, p: Processor, keep: std::cmp::Ordering) -> Result<Option<Bound>> {
    Ok(match (x, y) {
        (None, b) | (b, None) => b,
        (Some(x), Some(y)) => {
            let ord = p.compare(&x.value, &y.value)?;
            if ord == keep {
                Some(x)
            } else if ord.is_eq() {
                Some(Bound { value: x.value, inclusive: x.inclusive && y.inclusive })
            } else {
                Some(y)
            }
        }
    })
}

/// Intersection of two intervals.
fn intersect_intervals(a: Interval, b: Interval) -> Result<UnaryDenotation> {
    let (a_lo, a_hi, a_p) = a;
    let (b_lo, b_hi, b_p) = b;
    if a_p != b_p {
        return Err(Error::TypeMismatch(format!(
            "Cannot intersect {} and {} ranges",
            a_p.name(),
            b_p.name()
        )));
    }
    let lower = tighter(a_lo, b_lo, a_p, std::cmp::Ordering::Greater)?;
    let upper = tighter(a_hi, b_hi, a_p, std::cmp::Ordering::Less)?;
    let half = |comparator, bound: Bound| {
        UnaryDenotation::Comparison(Comparison {
            comparator,
            pivot: bound.value,
            processor: Some(a_p),
            type_checked: true,
        })
    };
    Ok(match (lower, upper) {
        (None, None) => UnaryDenotation::Everything,
        (Some(lo), None) => half(if lo.inclusive { Comparator::Ge } else { Comparator::Gt }, lo),
        (None, Some(hi)) => half(if hi.inclusive { Comparator::Le } else { Comparator::Lt }, hi),
        (Some(lo), Some(hi)) => match a_p.compare(&lo.value, &hi.value)? {
            std::cmp::Ordering::Less => {
                UnaryDenotation::Range(Range { lower: lo, upper: hi, processor: a_p })
            }
            std::cmp::Ordering::Equal if lo.inclusive && hi.inclusive => {
                UnaryDenotation::singleton(lo.value)
            }
            _ => UnaryDenotation::empty(),
        },
    })
}

// ============================================================================
// Construction and inspection
// ============================================================================

impl UnaryDenotation {
    pub fn empty() -> Self {
        UnaryDenotation::Explicit(ExplicitUnary::default())
    }

    pub fn singleton(v: Value) -> Self {
        UnaryDenotation::Explicit(ExplicitUnary::new(vec![v]))
    }

    pub fn explicit(values: impl IntoIterator<Item = Value>) -> Self {
        UnaryDenotation::Explicit(values.into_iter().collect())
    }

    pub fn comparison(comparator: Comparator, pivot: Value, config: &ExecutorConfig) -> Result<Self> {
        Comparison::new(comparator, pivot, config).map(UnaryDenotation::Comparison)
    }

    /// A date literal: complete dates are singletons, partial ones generic.
    pub fn generic_date(date: DateValue) -> Result<Self> {
        if date.is_complete() {
            Ok(UnaryDenotation::singleton(Value::Date(date)))
        } else if date.is_fully_unknown() {
            Err(Error::InvalidFormula("Date with no known component".into()))
        } else {
            Ok(UnaryDenotation::GenericDate(date))
        }
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, UnaryDenotation::Explicit(_))
    }

    pub fn is_everything(&self) -> bool {
        matches!(self, UnaryDenotation::Everything)
    }

    /// Number of entries, or `None` when unbounded.
    pub fn len(&self) -> Option<usize> {
        self.as_explicit().map(ExplicitUnary::len)
    }

    /// True only for an explicit empty denotation.
    pub fn is_empty(&self) -> bool {
        self.as_explicit().is_some_and(ExplicitUnary::is_empty)
    }

    pub fn as_explicit(&self) -> Option<&ExplicitUnary> {
        match self {
            UnaryDenotation::Explicit(e) => Some(e),
            _ => None,
        }
    }

    /// The entries of a finite denotation; fails fast on infinite ones.
    pub fn values(&self) -> Result<&[Value]> {
        match self {
            UnaryDenotation::Explicit(e) => Ok(e.values()),
            _ => Err(Error::InfiniteList(format!("Cannot enumerate {self}"))),
        }
    }

    pub fn contains(&self, v: &Value) -> Result<bool> {
        match self {
            UnaryDenotation::Explicit(e) => Ok(e.contains(v)),
            UnaryDenotation::Everything => Ok(true),
            UnaryDenotation::Comparison(c) => c.contains(v),
            UnaryDenotation::Range(r) => r.contains(v),
            UnaryDenotation::GenericDate(d) => Ok(v.as_date().is_some_and(|x| d.matches(&x))),
        }
    }

    pub fn uniqued(&self) -> UnaryDenotation {
        match self {
            UnaryDenotation::Explicit(e) => UnaryDenotation::Explicit(e.uniqued()),
            other => other.clone(),
        }
    }

    /// The only distinct value.
    pub fn single_value(&self) -> Result<&Value> {
        match self {
            UnaryDenotation::Explicit(e) if e.unique_len() == 1 => Ok(&e.values()[0]),
            UnaryDenotation::Explicit(e) => Err(Error::NonSingletonList(format!(
                "Expected one value, got {}",
                e.unique_len()
            ))),
            other => Err(Error::InfiniteList(format!("Expected one value, got {other}"))),
        }
    }

    /// The only value, as a positive integer (superlative rank and count).
    pub fn single_positive_integer(&self) -> Result<usize> {
        let v = self.single_value()?;
        match v.as_f64() {
            Some(x) if x >= 1.0 && x.fract() == 0.0 => Ok(x as usize),
            _ => Err(Error::TypeMismatch(format!("Expected a positive integer, got {v}"))),
        }
    }

    // ========================================================================
    // Set algebra
    // ========================================================================

    /// `and` / `or` with set semantics.
    pub fn merge(&self, other: &UnaryDenotation, mode: MergeMode) -> Result<UnaryDenotation> {
        use UnaryDenotation::{Everything, Explicit};
        match (self, other) {
            (Explicit(a), Explicit(b)) => Ok(Explicit(match mode {
                MergeMode::And => a.intersect(b),
                MergeMode::Or => a.union(b),
            })),
            (Everything, x) | (x, Everything) => Ok(match mode {
                MergeMode::And => x.uniqued(),
                MergeMode::Or => Everything,
            }),
            (Explicit(a), x) | (x, Explicit(a)) => match mode {
                MergeMode::And => Ok(Explicit(a.try_retain(|v| x.contains(v))?.uniqued())),
                MergeMode::Or => Err(Error::InfiniteList(format!("Cannot take the union of {self} and {other}"))),
            },
            (x, y) => x.merge_infinite(y, mode),
        }
    }

    fn not_equal_pivot(&self) -> Option<&Value> {
        match self {
            UnaryDenotation::Comparison(c) if c.comparator == Comparator::Ne => Some(&c.pivot),
            _ => None,
        }
    }

    fn merge_infinite(&self, other: &UnaryDenotation, mode: MergeMode) -> Result<UnaryDenotation> {
        let unsupported = || Error::InfiniteList(format!("Cannot {} {self} and {other}", mode.keyword()));
        for (ne, rest) in [(self, other), (other, self)] {
            let Some(pivot) = ne.not_equal_pivot() else { continue };
            return match mode {
                MergeMode::And if rest == ne => Ok(ne.clone()),
                MergeMode::And if !rest.contains(pivot)? => Ok(rest.clone()),
                MergeMode::And => Err(unsupported()),
                MergeMode::Or if rest.contains(pivot)? => Ok(UnaryDenotation::Everything),
                MergeMode::Or => Ok(ne.clone()),
            };
        }
        match (mode, self.interval(), other.interval()) {
            (MergeMode::And, Some(a), Some(b)) => intersect_intervals(a, b),
            _ => Err(unsupported()),
        }
    }

    /// Restrict to an upper bound. Explicit entries keep their multiplicity.
    pub fn filter(self, upper: &UnaryDenotation) -> Result<UnaryDenotation> {
        if upper.is_everything() {
            return Ok(self);
        }
        match self {
            UnaryDenotation::Explicit(e) => {
                Ok(UnaryDenotation::Explicit(e.try_retain(|v| upper.contains(v))?))
            }
            other => other.merge(upper, MergeMode::And),
        }
    }

    // ========================================================================
    // Aggregation and output
    // ========================================================================

    pub fn aggregate(&self, mode: AggregateMode, config: &ExecutorConfig) -> Result<UnaryDenotation> {
        let explicit = match self {
            UnaryDenotation::Explicit(e) => e,
            infinite => return infinite.aggregate_infinite(mode),
        };
        if mode == AggregateMode::Count {
            return Ok(UnaryDenotation::singleton(Value::number(explicit.unique_len() as f64)));
        }
        if explicit.is_empty() {
            return if config.aggregates_fail_on_empty_lists {
                Err(Error::EmptyList(format!("Cannot compute {} of an empty list", mode.keyword())))
            } else {
                Ok(UnaryDenotation::empty())
            };
        }
        let values = explicit.values();
        let processor = Processor::select(values, config.allow_string_comparison)?;
        let result = match mode {
            AggregateMode::Sum => processor.sum(values)?,
            AggregateMode::Avg => processor.avg(values)?,
            AggregateMode::Min => processor.min(values)?,
            AggregateMode::Max | AggregateMode::Count => processor.max(values)?,
        };
        Ok(UnaryDenotation::singleton(result))
    }

    /// Only a closed end of an infinite set can be aggregated.
    fn aggregate_infinite(&self, mode: AggregateMode) -> Result<UnaryDenotation> {
        let closed_end = match (mode, self) {
            (AggregateMode::Min, UnaryDenotation::Comparison(c)) if c.comparator == Comparator::Ge => Some(&c.pivot),
            (AggregateMode::Max, UnaryDenotation::Comparison(c)) if c.comparator == Comparator::Le => Some(&c.pivot),
            (AggregateMode::Min, UnaryDenotation::Range(r)) if r.lower.inclusive => Some(&r.lower.value),
            (AggregateMode::Max, UnaryDenotation::Range(r)) if r.upper.inclusive => Some(&r.upper.value),
            _ => None,
        };
        closed_end
            .map(|v| UnaryDenotation::singleton(v.clone()))
            .ok_or_else(|| Error::InfiniteList(format!("Cannot compute {} of {self}", mode.keyword())))
    }

    /// Output conversion: a deduplicated list, optionally sorted.
    pub fn to_answer(&self, config: &ExecutorConfig) -> Result<Answer> {
        match self {
            UnaryDenotation::Explicit(e) => {
                let mut values = e.uniqued().into_values();
                if config.sort_results {
                    values.sort();
                }
                if values.is_empty() && config.fail_on_empty_lists {
                    return Err(Error::EmptyList("The result is empty".into()));
                }
                Ok(Answer::List(values))
            }
            infinite if config.allow_implicit_values => Ok(Answer::Implicit(infinite.to_string())),
            infinite => Err(Error::InfiniteList(format!("Cannot convert {infinite} to a list"))),
        }
    }
}

impl fmt::Display for UnaryDenotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryDenotation::Explicit(e) => {
                write!(f, "(unary")?;
                for v in e.values() {
                    write!(f, " {v}")?;
                }
                write!(f, ")")
            }
            UnaryDenotation::Everything => write!(f, "*"),
            UnaryDenotation::Comparison(c) => write!(f, "({} {})", c.comparator, c.pivot),
            UnaryDenotation::Range(r) => {
                let lo = if r.lower.inclusive { ">=" } else { ">" };
                let hi = if r.upper.inclusive { "<=" } else { "<" };
                write!(f, "(and ({lo} {}) ({hi} {}))", r.lower.value, r.upper.value)
            }
            UnaryDenotation::GenericDate(d) => write!(f, "{}", Value::Date(*d)),
        }
    }
}
