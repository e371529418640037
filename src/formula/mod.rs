//! # Lambda DCS Formulas
//!
//! S-expression reader producing a clean AST.
//! Pure functions: no I/O, no state, no graph dependency.

pub mod ast;
pub mod lexer;
pub mod parser;

use crate::Result;

pub use ast::{AggregateMode, ArithmeticMode, Formula, MergeMode, SuperlativeMode};
pub use parser::{value_from_sexpr, SExpr};

/// Parse formula text into an AST.
pub fn parse(text: &str) -> Result<Formula> {
    let tokens = lexer::tokenize(text)?;
    parser::formula_from_sexpr(&parser::parse_sexpr(&tokens)?)
}

/// Read text as a single s-expression without interpreting it.
pub fn read_sexpr(text: &str) -> Result<SExpr> {
    let tokens = lexer::tokenize(text)?;
    parser::parse_sexpr(&tokens)
}

impl std::str::FromStr for Formula {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        parse(s)
    }
}
