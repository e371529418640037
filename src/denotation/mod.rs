//! # Denotations
//!
//! What a formula evaluates to against a fixed graph.
//!
//! - [`UnaryDenotation`]: a set of values, explicit or infinite
//! - [`BinaryDenotation`]: a relation, explicit, graph-backed or a comparator
//! - [`Processor`]: type-specific comparison and arithmetic over values
//!
//! Every denotation is immutable; operations return new denotations.
//! Infinite denotations are never iterated: asking for their values fails
//! with `infiniteList` instead of truncating.

pub mod unary;
pub mod binary;
pub mod processor;
pub mod ops;

pub use unary::{Bound, Comparison, ExplicitUnary, Range, UnaryDenotation};
pub use binary::BinaryDenotation;
pub use processor::Processor;
pub use ops::{arithmetic, superlative};

use std::cmp::Ordering;
use std::fmt;

/// The comparator relations usable as binaries, e.g. `(> (number 5))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Lt,
    Gt,
    Le,
    Ge,
    Ne,
}

impl Comparator {
    pub const ALL: [Comparator; 5] = [
        Comparator::Lt, Comparator::Gt, Comparator::Le, Comparator::Ge, Comparator::Ne,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Lt => "<",
            Comparator::Gt => ">",
            Comparator::Le => "<=",
            Comparator::Ge => ">=",
            Comparator::Ne => "!=",
        }
    }

    pub fn from_symbol(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.symbol() == s)
    }

    /// The comparator of the reversed relation.
    ///
    /// `(reverse >)` joined with `v` denotes `{x | x <= v}`, so `>` maps to
    /// `<=`, `<` to `>=`, and back. `!=` is symmetric.
    pub fn reverse(&self) -> Self {
        match self {
            Comparator::Lt => Comparator::Ge,
            Comparator::Ge => Comparator::Lt,
            Comparator::Gt => Comparator::Le,
            Comparator::Le => Comparator::Gt,
            Comparator::Ne => Comparator::Ne,
        }
    }

    /// Whether `candidate <op> pivot` holds, given `candidate.cmp(pivot)`.
    pub fn holds(&self, ord: Ordering) -> bool {
        match self {
            Comparator::Lt => ord == Ordering::Less,
            Comparator::Gt => ord == Ordering::Greater,
            Comparator::Le => ord != Ordering::Greater,
            Comparator::Ge => ord != Ordering::Less,
            Comparator::Ne => ord != Ordering::Equal,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_is_involution() {
        for c in Comparator::ALL {
            assert_eq!(c.reverse().reverse(), c);
        }
        assert_eq!(Comparator::Gt.reverse(), Comparator::Le);
        assert_eq!(Comparator::Ne.reverse(), Comparator::Ne);
    }

    #[test]
    fn test_symbols() {
        assert_eq!(Comparator::from_symbol(">="), Some(Comparator::Ge));
        assert_eq!(Comparator::from_symbol("="), None);
    }

    #[test]
    fn test_holds() {
        assert!(Comparator::Le.holds(Ordering::Equal));
        assert!(!Comparator::Lt.holds(Ordering::Equal));
        assert!(Comparator::Ne.holds(Ordering::Less));
    }
}
