//! # Value Model
//!
//! Immutable scalars that formulas denote, and the `Answer` DTO that leaves
//! the executor. These types cross every boundary: graph ↔ evaluator ↔ caller.
//!
//! Design rule: pure data, no I/O, no state.

pub mod value;
pub mod answer;

pub use value::{Value, NumberValue, DateValue, NameValue};
pub use answer::Answer;
