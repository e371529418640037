//! The caller-facing result of executing a formula.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::value::{quote, Value};
use crate::{Error, ErrorKind};

/// Output value produced at the executor boundary.
///
/// Errors never escape as panics or early returns here: a failed execution
/// becomes [`Answer::Error`] carrying the kind and message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Answer {
    /// Values of a unary denotation, deduplicated.
    List(Vec<Value>),
    /// Pairs of a binary denotation, deduplicated.
    PairList(Vec<(Value, Value)>),
    /// An infinite denotation in Lisp form, e.g. `(> (number 5))`.
    Implicit(String),
    Error { kind: ErrorKind, message: String },
}

impl Answer {
    pub fn from_error(err: &Error) -> Self {
        Answer::Error { kind: err.kind(), message: err.to_string() }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Answer::Error { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Answer::Error { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn values(&self) -> Option<&[Value]> {
        match self {
            Answer::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn pairs(&self) -> Option<&[(Value, Value)]> {
        match self {
            Answer::PairList(pairs) => Some(pairs),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::List(values) => {
                write!(f, "(list")?;
                for v in values {
                    write!(f, " {v}")?;
                }
                write!(f, ")")
            }
            Answer::PairList(pairs) => {
                write!(f, "(pairs")?;
                for (a, b) in pairs {
                    write!(f, " ({a} {b})")?;
                }
                write!(f, ")")
            }
            Answer::Implicit(text) => write!(f, "{text}"),
            Answer::Error { kind, message } => write!(f, "(error {kind} {})", quote(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_answer_keeps_kind() {
        let answer = Answer::from_error(&Error::InfiniteList("(count *)".into()));
        assert!(answer.is_error());
        assert_eq!(answer.error_kind(), Some(ErrorKind::InfiniteList));
    }

    #[test]
    fn test_display() {
        let answer = Answer::List(vec![Value::name("a"), Value::number(2.0)]);
        assert_eq!(answer.to_string(), "(list a (number 2))");
        let pairs = Answer::PairList(vec![(Value::name("a"), Value::name("b"))]);
        assert_eq!(pairs.to_string(), "(pairs (a b))");
    }

    #[test]
    fn test_json_tagging() {
        let json = Answer::List(vec![Value::number(1.0)]).to_json().unwrap();
        assert!(json.starts_with("{\"type\":\"List\""));
        let back: Answer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Answer::List(vec![Value::number(1.0)]));
    }
}
