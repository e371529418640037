//! # lambda-dcs: Lambda DCS execution engine
//!
//! Evaluates Lambda DCS logical forms (dependency-based compositional
//! semantics) against a knowledge graph and returns concrete answers.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `KnowledgeGraph` is the contract between evaluator and storage
//! 2. **Closed denotations**: unary/binary denotations are enums, every case is matched
//! 3. **Lazy by default**: type hints carry upper bounds so infinite sets stay symbolic
//! 4. **Errors are values at the edge**: the `Executor` turns every `Error` into an `Answer`
//!
//! ## Quick Start
//!
//! ```rust
//! use lambda_dcs::{Answer, Executor, ExecutorConfig, TripleGraph, Value};
//!
//! # fn example() -> lambda_dcs::Result<()> {
//! let graph = TripleGraph::from_lisp(
//!     "(graph (obama place_of_birth honolulu) (kidman place_of_birth honolulu))",
//! )?;
//! let executor = Executor::new(ExecutorConfig::default());
//!
//! let answer = executor.execute_str("(count (place_of_birth honolulu))", &graph).into_result()?;
//! assert_eq!(answer, Answer::List(vec![Value::number(2.0)]));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Denotations
//!
//! | Shape  | Variant | Meaning |
//! |--------|---------|---------|
//! | Unary  | Explicit | concrete list with a dedup set view |
//! | Unary  | Everything / Comparison / Range / GenericDate | infinite, never iterated |
//! | Binary | Explicit | concrete pairs |
//! | Binary | Predicate | relation names resolved by the graph |
//! | Binary | Special | comparator relations `<` `>` `<=` `>=` `!=` |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod formula;
pub mod rewrite;
pub mod denotation;
pub mod hint;
pub mod storage;
pub mod execution;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{Answer, DateValue, NameValue, NumberValue, Value};

// ============================================================================
// Re-exports: Formulas
// ============================================================================

pub use formula::{
    Formula, MergeMode, AggregateMode, SuperlativeMode, ArithmeticMode,
};

// ============================================================================
// Re-exports: Denotations and hints
// ============================================================================

pub use denotation::{BinaryDenotation, Comparator, Processor, UnaryDenotation};
pub use hint::{BinaryHint, UnaryHint, VariableMap};

// ============================================================================
// Re-exports: Storage
// ============================================================================

pub use storage::{GraphId, KnowledgeGraph, TripleGraph};

// ============================================================================
// Re-exports: Execution
// ============================================================================

pub use execution::{
    ConfigFingerprint, Executor, ExecutorConfig, ExecutorCache, ExecutionStats, Response,
};

// ============================================================================
// Error Types
// ============================================================================

/// Evaluation failure. Every variant maps to one [`ErrorKind`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Formula syntax error at position {position}: {message}")]
    SyntaxError { position: usize, message: String },

    #[error("Invalid formula: {0}")]
    InvalidFormula(String),

    #[error("Empty list: {0}")]
    EmptyList(String),

    #[error("Expected a single value: {0}")]
    NonSingletonList(String),

    #[error("Infinite list: {0}")]
    InfiniteList(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Not a unary: {0}")]
    NotUnary(String),

    #[error("Not a binary: {0}")]
    NotBinary(String),

    #[error("Execution failed: {0}")]
    Unknown(String),
}

/// The closed error taxonomy carried by [`Answer::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    InvalidFormula,
    EmptyList,
    NonSingletonList,
    InfiniteList,
    TypeMismatch,
    NotUnary,
    NotBinary,
    Unknown,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::SyntaxError { .. } | Error::InvalidFormula(_) => ErrorKind::InvalidFormula,
            Error::EmptyList(_) => ErrorKind::EmptyList,
            Error::NonSingletonList(_) => ErrorKind::NonSingletonList,
            Error::InfiniteList(_) => ErrorKind::InfiniteList,
            Error::TypeMismatch(_) => ErrorKind::TypeMismatch,
            Error::NotUnary(_) => ErrorKind::NotUnary,
            Error::NotBinary(_) => ErrorKind::NotBinary,
            Error::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Combine the failures of two alternative strategies.
    ///
    /// The kind survives when both attempts agree, otherwise the result is
    /// [`Error::Unknown`].
    pub fn either(context: &str, first: Error, second: Error) -> Error {
        let message = format!("{context} | {first} | {second}");
        if first.kind() != second.kind() {
            return Error::Unknown(message);
        }
        match first {
            Error::SyntaxError { position, .. } => Error::SyntaxError { position, message },
            Error::InvalidFormula(_) => Error::InvalidFormula(message),
            Error::EmptyList(_) => Error::EmptyList(message),
            Error::NonSingletonList(_) => Error::NonSingletonList(message),
            Error::InfiniteList(_) => Error::InfiniteList(message),
            Error::TypeMismatch(_) => Error::TypeMismatch(message),
            Error::NotUnary(_) => Error::NotUnary(message),
            Error::NotBinary(_) => Error::NotBinary(message),
            Error::Unknown(_) => Error::Unknown(message),
        }
    }
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidFormula => "invalidFormula",
            ErrorKind::EmptyList => "emptyList",
            ErrorKind::NonSingletonList => "nonSingletonList",
            ErrorKind::InfiniteList => "infiniteList",
            ErrorKind::TypeMismatch => "typeMismatch",
            ErrorKind::NotUnary => "notUnary",
            ErrorKind::NotBinary => "notBinary",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Kinds a caller may tolerate by restricting or reconfiguring the query.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ErrorKind::EmptyList
                | ErrorKind::NonSingletonList
                | ErrorKind::InfiniteList
                | ErrorKind::TypeMismatch
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_either_keeps_matching_kind() {
        let err = Error::either(
            "join",
            Error::InfiniteList("a".into()),
            Error::InfiniteList("b".into()),
        );
        assert_eq!(err.kind(), ErrorKind::InfiniteList);
        assert!(err.to_string().contains("a | "));
    }

    #[test]
    fn test_either_mixed_kinds_is_unknown() {
        let err = Error::either(
            "merge",
            Error::TypeMismatch("a".into()),
            Error::EmptyList("b".into()),
        );
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }

    #[test]
    fn test_syntax_error_is_invalid_formula() {
        let err = Error::SyntaxError { position: 3, message: "unbalanced".into() };
        assert_eq!(err.kind(), ErrorKind::InvalidFormula);
        assert!(!err.kind().is_recoverable());
        assert!(ErrorKind::TypeMismatch.is_recoverable());
    }
}
