//! Type processors: comparison, sorting and arithmetic per value type.
//!
//! A processor is chosen by inspecting the values involved, with strict
//! precedence: all numbers, then all dates, then all strings (only when
//! string comparison is allowed). Anything else is a type mismatch.

use std::cmp::Ordering;

use crate::formula::ArithmeticMode;
use crate::model::{DateValue, NumberValue, Value};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processor {
    Number,
    Date,
    String,
}

impl Processor {
    /// Pick the processor able to handle every value. An empty input is numeric.
    pub fn select<'a, I>(values: I, allow_strings: bool) -> Result<Processor>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let values: Vec<&Value> = values.into_iter().collect();
        if values.iter().all(|v| v.is_number()) {
            Ok(Processor::Number)
        } else if values.iter().all(|v| v.is_date()) {
            Ok(Processor::Date)
        } else if allow_strings && values.iter().all(|v| matches!(v, Value::String(_))) {
            Ok(Processor::String)
        } else {
            let mut kinds: Vec<&str> = values.iter().map(|v| v.type_name()).collect();
            kinds.sort_unstable();
            kinds.dedup();
            Err(Error::TypeMismatch(format!("Cannot compare values of types [{}]", kinds.join(", "))))
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Processor::Number => "number",
            Processor::Date => "date",
            Processor::String => "string",
        }
    }

    pub fn accepts(&self, v: &Value) -> bool {
        matches!(
            (self, v),
            (Processor::Number, Value::Number(_))
                | (Processor::Date, Value::Date(_))
                | (Processor::String, Value::String(_))
        )
    }

    /// Compare two values of this processor's type.
    pub fn compare(&self, a: &Value, b: &Value) -> Result<Ordering> {
        if !self.accepts(a) || !self.accepts(b) {
            return Err(Error::TypeMismatch(format!("Cannot compare {a} with {b} as {}", self.name())));
        }
        if let (Value::Number(x), Value::Number(y)) = (a, b) {
            if !units_compatible(x, y) {
                return Err(Error::TypeMismatch(format!("Cannot compare {a} with {b}: different units")));
            }
        }
        Ok(self.ordering(a, b))
    }

    /// Ordering of two already-validated values.
    fn ordering(&self, a: &Value, b: &Value) -> Ordering {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => x.value.total_cmp(&y.value),
            (Value::Date(x), Value::Date(y)) => compare_dates(x, y),
            (Value::String(x), Value::String(y)) => x.cmp(y),
            _ => Ordering::Equal,
        }
    }

    /// Values can be ordered together: same type, one unit, one unknown-date pattern.
    pub fn check_sortable(&self, values: &[Value]) -> Result<()> {
        if let Some(bad) = values.iter().find(|v| !self.accepts(v)) {
            return Err(Error::TypeMismatch(format!("Cannot sort {bad} among {} values", self.name())));
        }
        match self {
            Processor::Number => {
                common_unit(values)?;
            }
            Processor::Date => {
                let mut patterns = values.iter().filter_map(Value::as_date).map(|d| d.unknown_pattern());
                if let Some(first) = patterns.next() {
                    if patterns.any(|p| p != first) {
                        return Err(Error::TypeMismatch(
                            "Cannot sort dates with different unknown components".into(),
                        ));
                    }
                }
            }
            Processor::String => {}
        }
        Ok(())
    }

    /// The first maximal value.
    pub fn max(&self, values: &[Value]) -> Result<Value> {
        self.extreme(values, Ordering::Greater)
    }

    /// The first minimal value.
    pub fn min(&self, values: &[Value]) -> Result<Value> {
        self.extreme(values, Ordering::Less)
    }

    fn extreme(&self, values: &[Value], better: Ordering) -> Result<Value> {
        self.check_sortable(values)?;
        let mut iter = values.iter();
        let Some(mut best) = iter.next() else {
            return Err(Error::EmptyList(format!("Cannot take the extreme of an empty {} list", self.name())));
        };
        for v in iter {
            if self.ordering(v, best) == better {
                best = v;
            }
        }
        Ok(best.clone())
    }

    /// Indices that sort `values` ascending; ties keep their input order.
    pub fn argsort(&self, values: &[Value]) -> Result<Vec<usize>> {
        self.check_sortable(values)?;
        let mut indices: Vec<usize> = (0..values.len()).collect();
        indices.sort_by(|&i, &j| self.ordering(&values[i], &values[j]));
        Ok(indices)
    }

    pub fn sum(&self, values: &[Value]) -> Result<Value> {
        let numbers = self.numbers(values, "sum")?;
        let unit = common_unit(values)?;
        Ok(Value::Number(NumberValue::new(numbers.iter().sum(), unit)))
    }

    pub fn avg(&self, values: &[Value]) -> Result<Value> {
        let numbers = self.numbers(values, "avg")?;
        if numbers.is_empty() {
            return Err(Error::EmptyList("Cannot average an empty list".into()));
        }
        let unit = common_unit(values)?;
        let mean = numbers.iter().sum::<f64>() / numbers.len() as f64;
        Ok(Value::Number(NumberValue::new(mean, unit)))
    }

    fn numbers(&self, values: &[Value], op: &str) -> Result<Vec<f64>> {
        if *self != Processor::Number {
            return Err(Error::TypeMismatch(format!("Cannot compute {op} over {} values", self.name())));
        }
        values
            .iter()
            .map(|v| v.as_f64().ok_or_else(|| Error::TypeMismatch(format!("Cannot compute {op} with {v}"))))
            .collect()
    }

    /// Apply an arithmetic operator. Only numbers support arithmetic.
    pub fn apply(&self, mode: ArithmeticMode, a: &Value, b: &Value) -> Result<Value> {
        let (Processor::Number, Value::Number(x), Value::Number(y)) = (self, a, b) else {
            return Err(Error::TypeMismatch(format!(
                "Cannot compute ({} {a} {b})",
                mode.keyword()
            )));
        };
        let mismatch = || Error::TypeMismatch(format!("Incompatible units in ({} {a} {b})", mode.keyword()));
        let (value, unit) = match mode {
            ArithmeticMode::Add | ArithmeticMode::Sub => {
                if !units_compatible(x, y) {
                    return Err(mismatch());
                }
                let value = if mode == ArithmeticMode::Add { x.value + y.value } else { x.value - y.value };
                (value, x.unit.clone().or_else(|| y.unit.clone()))
            }
            ArithmeticMode::Mul => match (&x.unit, &y.unit) {
                (Some(_), Some(_)) => return Err(mismatch()),
                (u, None) | (None, u) => (x.value * y.value, u.clone()),
            },
            ArithmeticMode::Div => match (&x.unit, &y.unit) {
                (u, None) => (x.value / y.value, u.clone()),
                (Some(p), Some(q)) if p == q => (x.value / y.value, None),
                _ => return Err(mismatch()),
            },
        };
        Ok(Value::Number(NumberValue::new(value, unit)))
    }
}

/// Unknown components match anything; the first known difference decides.
pub fn compare_dates(a: &DateValue, b: &DateValue) -> Ordering {
    for (x, y) in [(a.year, b.year), (a.month, b.month), (a.day, b.day)] {
        if x != DateValue::UNKNOWN && y != DateValue::UNKNOWN && x != y {
            return x.cmp(&y);
        }
    }
    Ordering::Equal
}

fn units_compatible(a: &NumberValue, b: &NumberValue) -> bool {
    match (&a.unit, &b.unit) {
        (Some(x), Some(y)) => x == y,
        _ => true,
    }
}

/// The single unit shared by all numbers, if any carry one.
fn common_unit(values: &[Value]) -> Result<Option<String>> {
    let mut unit: Option<&String> = None;
    for n in values.iter().filter_map(Value::as_number) {
        match (unit, &n.unit) {
            (Some(u), Some(v)) if u != v => {
                return Err(Error::TypeMismatch(format!("Mixed units {u} and {v}")));
            }
            (None, Some(v)) => unit = Some(v),
            _ => {}
        }
    }
    Ok(unit.cloned())
}
