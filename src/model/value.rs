//! Scalar values denoted by Lambda DCS formulas.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A single value in a denotation.
///
/// Values are immutable and compared structurally, with two exceptions:
/// - numbers compare by bit pattern (so they can live in hash sets; `-0.0`
///   is normalized to `0.0` on construction)
/// - names compare by `id` only, the description is display metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Boolean(bool),
    Number(NumberValue),
    Date(DateValue),
    String(String),
    Name(NameValue),
}

/// A number with an optional unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumberValue {
    pub value: f64,
    pub unit: Option<String>,
}

/// A calendar date. Any component may be [`DateValue::UNKNOWN`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DateValue {
    pub year: i32,
    pub month: i32,
    pub day: i32,
}

/// A named entity or relation identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameValue {
    pub id: String,
    pub description: Option<String>,
}

// ============================================================================
// Constructors
// ============================================================================

impl Value {
    pub fn number(value: f64) -> Self {
        Value::Number(NumberValue::new(value, None))
    }

    pub fn number_with_unit(value: f64, unit: impl Into<String>) -> Self {
        Value::Number(NumberValue::new(value, Some(unit.into())))
    }

    pub fn date(year: i32, month: i32, day: i32) -> Self {
        Value::Date(DateValue::new(year, month, day))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn name(id: impl Into<String>) -> Self {
        Value::Name(NameValue { id: id.into(), description: None })
    }

    pub fn described_name(id: impl Into<String>, description: impl Into<String>) -> Self {
        Value::Name(NameValue { id: id.into(), description: Some(description.into()) })
    }
}

impl NumberValue {
    pub fn new(value: f64, unit: Option<String>) -> Self {
        // -0.0 and 0.0 must hash alike
        let value = if value == 0.0 { 0.0 } else { value };
        Self { value, unit }
    }

    fn bits(&self) -> u64 {
        if self.value.is_nan() { f64::NAN.to_bits() } else { self.value.to_bits() }
    }
}

impl PartialEq for NumberValue {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits() && self.unit == other.unit
    }
}

impl Eq for NumberValue {}

impl Hash for NumberValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
        self.unit.hash(state);
    }
}

impl PartialEq for NameValue {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NameValue {}

impl Hash for NameValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// ============================================================================
// Type checking
// ============================================================================

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::Date(_) => "date",
            Value::String(_) => "string",
            Value::Name(_) => "name",
        }
    }

    pub fn same_kind(&self, other: &Value) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    pub fn is_number(&self) -> bool { matches!(self, Value::Number(_)) }
    pub fn is_date(&self) -> bool { matches!(self, Value::Date(_)) }

    /// Everything except `false` counts as a satisfied condition.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false))
    }

    pub fn as_number(&self) -> Option<&NumberValue> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_number().map(|n| n.value)
    }

    pub fn as_date(&self) -> Option<DateValue> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// The id of a name value.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Value::Name(n) => Some(&n.id),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::Boolean(_) => 0,
            Value::Number(_) => 1,
            Value::Date(_) => 2,
            Value::String(_) => 3,
            Value::Name(_) => 4,
        }
    }
}

// ============================================================================
// Dates
// ============================================================================

impl DateValue {
    pub const UNKNOWN: i32 = -1;

    pub fn new(year: i32, month: i32, day: i32) -> Self {
        Self { year, month, day }
    }

    pub fn is_complete(&self) -> bool {
        self.year != Self::UNKNOWN && self.month != Self::UNKNOWN && self.day != Self::UNKNOWN
    }

    pub fn is_fully_unknown(&self) -> bool {
        self.year == Self::UNKNOWN && self.month == Self::UNKNOWN && self.day == Self::UNKNOWN
    }

    /// Which components are unknown, as (year, month, day).
    pub fn unknown_pattern(&self) -> (bool, bool, bool) {
        (self.year == Self::UNKNOWN, self.month == Self::UNKNOWN, self.day == Self::UNKNOWN)
    }

    /// True if `other` agrees with every known component of `self`.
    pub fn matches(&self, other: &DateValue) -> bool {
        let agree = |mine: i32, theirs: i32| mine == Self::UNKNOWN || mine == theirs;
        agree(self.year, other.year) && agree(self.month, other.month) && agree(self.day, other.day)
    }

    /// Earliest date matching this one. An unknown year stays unknown.
    pub fn earliest(&self) -> DateValue {
        DateValue {
            year: self.year,
            month: if self.month == Self::UNKNOWN { 1 } else { self.month },
            day: if self.day == Self::UNKNOWN { 1 } else { self.day },
        }
    }

    /// Latest date matching this one. An unknown year stays unknown.
    pub fn latest(&self) -> DateValue {
        let month = if self.month == Self::UNKNOWN { 12 } else { self.month };
        let day = if self.day == Self::UNKNOWN {
            days_in_month(self.year, month)
        } else {
            self.day
        };
        DateValue { year: self.year, month, day }
    }
}

impl From<NaiveDate> for DateValue {
    fn from(d: NaiveDate) -> Self {
        DateValue::new(d.year(), d.month() as i32, d.day() as i32)
    }
}

/// Days in `month`; an unknown year is treated as a leap year.
fn days_in_month(year: i32, month: i32) -> i32 {
    let year = if year == DateValue::UNKNOWN { 2000 } else { year };
    let (next_year, next_month) = if month >= 12 { (year + 1, 1) } else { (year, month + 1) };
    u32::try_from(next_month)
        .ok()
        .and_then(|m| NaiveDate::from_ymd_opt(next_year, m, 1))
        .and_then(|d| d.pred_opt())
        .map_or(31, |d| d.day() as i32)
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Boolean(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::number(v as f64) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::number(v as f64) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::number(v) } }
impl From<DateValue> for Value { fn from(v: DateValue) -> Self { Value::Date(v) } }
impl From<NaiveDate> for Value { fn from(v: NaiveDate) -> Self { Value::Date(v.into()) } }

// ============================================================================
// Total order (output sorting only)
// ============================================================================

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => {
                a.value.total_cmp(&b.value).then_with(|| a.unit.cmp(&b.unit))
            }
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Name(a), Value::Name(b)) => a.id.cmp(&b.id),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ============================================================================
// Display (Lisp form)
// ============================================================================

/// Integral numbers print without a fractional part.
pub(crate) fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

pub(crate) fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Whether `id` can be printed as a bare atom and read back as a name.
pub(crate) fn is_bare_atom(id: &str) -> bool {
    !id.is_empty()
        && !id.chars().any(|c| c.is_whitespace() || c == '(' || c == ')' || c == '"')
        && !looks_numeric(id)
}

pub(crate) fn looks_numeric(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    digits.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && digits.parse::<f64>().is_ok()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "(boolean {b})"),
            Value::Number(n) => match &n.unit {
                Some(unit) => write!(f, "(number {} {unit})", format_number(n.value)),
                None => write!(f, "(number {})", format_number(n.value)),
            },
            Value::Date(d) => write!(f, "(date {} {} {})", d.year, d.month, d.day),
            Value::String(s) => write!(f, "(string {})", quote(s)),
            Value::Name(n) => match &n.description {
                Some(desc) => write!(f, "(name {} {})", n.id, quote(desc)),
                None if is_bare_atom(&n.id) => write!(f, "{}", n.id),
                None => write!(f, "(name {})", quote(&n.id)),
            },
        }
    }
}
