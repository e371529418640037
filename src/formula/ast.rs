//! Lambda DCS AST
//!
//! These types represent parsed logical forms. They are pure data:
//! no denotations, no graph references, no evaluation logic.

use std::fmt;

use crate::model::value::{is_bare_atom, quote};
use crate::model::Value;

/// A Lambda DCS formula.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    /// A literal: entity, relation name, number, date, string or boolean.
    Value(Value),
    /// Reference to a lambda- or mark-bound variable: `(var x)`.
    Variable(String),
    /// `(relation child)`: the values related by `relation` to something in `child`.
    Join { relation: Box<Formula>, child: Box<Formula> },
    /// `(reverse relation)`.
    Reverse(Box<Formula>),
    /// `(and a b)` / `(or a b)`.
    Merge { mode: MergeMode, left: Box<Formula>, right: Box<Formula> },
    /// `(mark x body)`: values v such that `body[x := v]` contains v.
    Mark { var: String, body: Box<Formula> },
    /// `(lambda x body)`: a relation abstracted over `x`.
    Lambda { var: String, body: Box<Formula> },
    /// `(count f)`, `(sum f)`, ...
    Aggregate { mode: AggregateMode, child: Box<Formula> },
    /// `(argmax rank count head degree)`.
    Superlative {
        mode: SuperlativeMode,
        rank: Box<Formula>,
        count: Box<Formula>,
        head: Box<Formula>,
        relation: Box<Formula>,
    },
    /// `(+ a b)`, `(- a b)`, `(* a b)`, `(/ a b)`.
    Arithmetic { mode: ArithmeticMode, left: Box<Formula>, right: Box<Formula> },
    /// `(filter base relation)`: elements of `base` for which `relation` holds.
    Filter { base: Box<Formula>, relation: Box<Formula> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeMode { And, Or }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateMode { Count, Sum, Avg, Min, Max }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuperlativeMode { Argmax, Argmin }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticMode { Add, Sub, Mul, Div }

// ============================================================================
// Keywords
// ============================================================================

impl MergeMode {
    pub fn keyword(&self) -> &'static str {
        match self {
            MergeMode::And => "and",
            MergeMode::Or => "or",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "and" => Some(MergeMode::And),
            "or" => Some(MergeMode::Or),
            _ => None,
        }
    }
}

impl AggregateMode {
    pub fn keyword(&self) -> &'static str {
        match self {
            AggregateMode::Count => "count",
            AggregateMode::Sum => "sum",
            AggregateMode::Avg => "avg",
            AggregateMode::Min => "min",
            AggregateMode::Max => "max",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "count" => Some(AggregateMode::Count),
            "sum" => Some(AggregateMode::Sum),
            "avg" => Some(AggregateMode::Avg),
            "min" => Some(AggregateMode::Min),
            "max" => Some(AggregateMode::Max),
            _ => None,
        }
    }
}

impl SuperlativeMode {
    pub fn keyword(&self) -> &'static str {
        match self {
            SuperlativeMode::Argmax => "argmax",
            SuperlativeMode::Argmin => "argmin",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "argmax" => Some(SuperlativeMode::Argmax),
            "argmin" => Some(SuperlativeMode::Argmin),
            _ => None,
        }
    }
}

impl ArithmeticMode {
    pub fn keyword(&self) -> &'static str {
        match self {
            ArithmeticMode::Add => "+",
            ArithmeticMode::Sub => "-",
            ArithmeticMode::Mul => "*",
            ArithmeticMode::Div => "/",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "+" => Some(ArithmeticMode::Add),
            "-" => Some(ArithmeticMode::Sub),
            "*" => Some(ArithmeticMode::Mul),
            "/" => Some(ArithmeticMode::Div),
            _ => None,
        }
    }
}

// ============================================================================
// Builders
// ============================================================================

impl Formula {
    /// The name literal `*`, denoting every value.
    pub const EVERYTHING: &'static str = "*";

    pub fn value(v: impl Into<Value>) -> Self {
        Formula::Value(v.into())
    }

    pub fn name(id: impl Into<String>) -> Self {
        Formula::Value(Value::name(id))
    }

    pub fn everything() -> Self {
        Formula::name(Self::EVERYTHING)
    }

    pub fn var(name: impl Into<String>) -> Self {
        Formula::Variable(name.into())
    }

    pub fn join(relation: Formula, child: Formula) -> Self {
        Formula::Join { relation: Box::new(relation), child: Box::new(child) }
    }

    pub fn reverse(relation: Formula) -> Self {
        Formula::Reverse(Box::new(relation))
    }

    pub fn merge(mode: MergeMode, left: Formula, right: Formula) -> Self {
        Formula::Merge { mode, left: Box::new(left), right: Box::new(right) }
    }

    pub fn lambda(var: impl Into<String>, body: Formula) -> Self {
        Formula::Lambda { var: var.into(), body: Box::new(body) }
    }

    pub fn mark(var: impl Into<String>, body: Formula) -> Self {
        Formula::Mark { var: var.into(), body: Box::new(body) }
    }

    pub fn aggregate(mode: AggregateMode, child: Formula) -> Self {
        Formula::Aggregate { mode, child: Box::new(child) }
    }

    pub fn arithmetic(mode: ArithmeticMode, left: Formula, right: Formula) -> Self {
        Formula::Arithmetic { mode, left: Box::new(left), right: Box::new(right) }
    }

    pub fn superlative(
        mode: SuperlativeMode,
        rank: usize,
        count: usize,
        head: Formula,
        relation: Formula,
    ) -> Self {
        Formula::Superlative {
            mode,
            rank: Box::new(Formula::value(rank as f64)),
            count: Box::new(Formula::value(count as f64)),
            head: Box::new(head),
            relation: Box::new(relation),
        }
    }

    pub fn filter(base: Formula, relation: Formula) -> Self {
        Formula::Filter { base: Box::new(base), relation: Box::new(relation) }
    }

    /// The name id if this formula is a bare name literal.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Formula::Value(v) => v.as_name(),
            _ => None,
        }
    }
}

// ============================================================================
// Display (re-parseable Lisp form)
// ============================================================================

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Value(v) => write!(f, "{v}"),
            Formula::Variable(name) => write!(f, "(var {})", display_var(name)),
            Formula::Join { relation, child } => write!(f, "({relation} {child})"),
            Formula::Reverse(r) => write!(f, "(reverse {r})"),
            Formula::Merge { mode, left, right } => {
                write!(f, "({} {left} {right})", mode.keyword())
            }
            Formula::Mark { var, body } => write!(f, "(mark {} {body})", display_var(var)),
            Formula::Lambda { var, body } => write!(f, "(lambda {} {body})", display_var(var)),
            Formula::Aggregate { mode, child } => write!(f, "({} {child})", mode.keyword()),
            Formula::Superlative { mode, rank, count, head, relation } => {
                write!(f, "({} {rank} {count} {head} {relation})", mode.keyword())
            }
            Formula::Arithmetic { mode, left, right } => {
                write!(f, "({} {left} {right})", mode.keyword())
            }
            Formula::Filter { base, relation } => write!(f, "(filter {base} {relation})"),
        }
    }
}

/// Render a variable name; names that are not plain atoms are quoted.
fn display_var(name: &str) -> String {
    if is_bare_atom(name) { name.to_string() } else { quote(name) }
}
