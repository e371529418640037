//! # Type hints
//!
//! A hint travels down the formula tree during evaluation. It carries an
//! upper bound on the denotation being computed (so `(and (> 5) X)` can
//! ask for `X` restricted to `(> 5)` instead of materializing everything)
//! and the variable environment.
//!
//! - [`UnaryHint`]: one upper bound for a unary denotation
//! - [`BinaryHint`]: upper bounds for both ends of a binary denotation

pub mod variables;

pub use variables::{Lookup, VariableMap};

use std::fmt;
use std::sync::Arc;

use crate::denotation::UnaryDenotation;
use crate::formula::MergeMode;
use crate::model::Value;
use crate::Result;

// ============================================================================
// UnaryHint
// ============================================================================

/// Upper bound and variables for a unary sub-formula.
#[derive(Debug, Clone)]
pub struct UnaryHint {
    upper_bound: Arc<UnaryDenotation>,
    vars: VariableMap,
}

impl UnaryHint {
    /// No restriction, no variables.
    pub fn unrestricted() -> Self {
        Self::restricted(UnaryDenotation::Everything)
    }

    pub fn restricted(bound: UnaryDenotation) -> Self {
        Self { upper_bound: Arc::new(bound), vars: VariableMap::new() }
    }

    pub fn upper_bound(&self) -> &UnaryDenotation {
        &self.upper_bound
    }

    pub fn vars(&self) -> &VariableMap {
        &self.vars
    }

    pub fn is_unrestricted(&self) -> bool {
        self.upper_bound.is_everything()
    }

    /// Same variables, no bound. Used for children whose result is not a
    /// subset of the parent's (aggregates, arithmetic operands).
    pub fn unrestricted_unary(&self) -> Self {
        Self { upper_bound: Arc::new(UnaryDenotation::Everything), vars: self.vars.clone() }
    }

    /// Same variables, bound replaced.
    pub fn with_bound(&self, bound: UnaryDenotation) -> Self {
        Self { upper_bound: Arc::new(bound), vars: self.vars.clone() }
    }

    /// Tighten the bound with `and`.
    pub fn restrict(&self, bound: &UnaryDenotation) -> Result<Self> {
        if self.is_unrestricted() {
            return Ok(self.with_bound(bound.clone()));
        }
        Ok(self.with_bound(self.upper_bound.merge(bound, MergeMode::And)?))
    }

    pub fn with_var(&self, name: &str, value: Value) -> Self {
        Self { upper_bound: self.upper_bound.clone(), vars: self.vars.plus(name, value) }
    }

    pub fn with_free_var(&self, name: &str) -> Result<Self> {
        Ok(Self { upper_bound: self.upper_bound.clone(), vars: self.vars.plus_free_var(name)? })
    }

    /// Hint for the relation of a join `(r child)` whose result is bounded
    /// by this hint: the bound applies to the relation's first end.
    pub fn as_first_of_binary(&self) -> BinaryHint {
        BinaryHint {
            first: self.upper_bound.clone(),
            second: Arc::new(UnaryDenotation::Everything),
            vars: self.vars.clone(),
        }
    }

    /// Like [`as_first_of_binary`](Self::as_first_of_binary), with the
    /// second end already known.
    pub fn as_first_of_binary_with_second(&self, second: UnaryDenotation) -> BinaryHint {
        BinaryHint { first: self.upper_bound.clone(), second: Arc::new(second), vars: self.vars.clone() }
    }

    /// The bound applies to the second end of a binary.
    pub fn as_second_of_binary(&self) -> BinaryHint {
        BinaryHint {
            first: Arc::new(UnaryDenotation::Everything),
            second: self.upper_bound.clone(),
            vars: self.vars.clone(),
        }
    }

    /// Restrict a computed denotation to this hint's bound.
    pub fn apply_bound(&self, denotation: UnaryDenotation) -> Result<UnaryDenotation> {
        denotation.filter(&self.upper_bound)
    }
}

impl Default for UnaryHint {
    fn default() -> Self {
        Self::unrestricted()
    }
}

impl fmt::Display for UnaryHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnaryHint(upper={}, vars={})", self.upper_bound, self.vars)
    }
}

// ============================================================================
// BinaryHint
// ============================================================================

/// Upper bounds on both ends of a binary sub-formula.
#[derive(Debug, Clone)]
pub struct BinaryHint {
    first: Arc<UnaryDenotation>,
    second: Arc<UnaryDenotation>,
    vars: VariableMap,
}

impl BinaryHint {
    pub fn unrestricted() -> Self {
        Self::new(UnaryDenotation::Everything, UnaryDenotation::Everything, VariableMap::new())
    }

    pub fn new(first: UnaryDenotation, second: UnaryDenotation, vars: VariableMap) -> Self {
        Self { first: Arc::new(first), second: Arc::new(second), vars }
    }

    pub fn first(&self) -> &UnaryDenotation {
        &self.first
    }

    pub fn second(&self) -> &UnaryDenotation {
        &self.second
    }

    pub fn vars(&self) -> &VariableMap {
        &self.vars
    }

    /// Swap the two ends.
    pub fn reverse(&self) -> Self {
        Self { first: self.second.clone(), second: self.first.clone(), vars: self.vars.clone() }
    }

    /// Unary hint bounded by the first end.
    pub fn first_as_unary(&self) -> UnaryHint {
        UnaryHint { upper_bound: self.first.clone(), vars: self.vars.clone() }
    }

    /// Unary hint bounded by the second end.
    pub fn second_as_unary(&self) -> UnaryHint {
        UnaryHint { upper_bound: self.second.clone(), vars: self.vars.clone() }
    }
}

impl Default for BinaryHint {
    fn default() -> Self {
        Self::unrestricted()
    }
}

impl fmt::Display for BinaryHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BinaryHint(first={}, second={}, vars={})", self.first, self.second, self.vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::denotation::Comparator;
    use crate::execution::ExecutorConfig;

    fn gt(x: f64) -> UnaryDenotation {
        UnaryDenotation::comparison(Comparator::Gt, Value::number(x), &ExecutorConfig::default()).unwrap()
    }

    #[test]
    fn test_restrict_tightens() {
        let hint = UnaryHint::unrestricted().restrict(&gt(3.0)).unwrap();
        assert_eq!(hint.upper_bound(), &gt(3.0));
        let hint = hint.restrict(&gt(5.0)).unwrap();
        assert_eq!(hint.upper_bound(), &gt(5.0));
    }

    #[test]
    fn test_apply_bound() {
        let hint = UnaryHint::restricted(gt(5.0));
        let values = UnaryDenotation::explicit([Value::number(1.0), Value::number(7.0)]);
        assert_eq!(hint.apply_bound(values).unwrap(), UnaryDenotation::singleton(Value::number(7.0)));
    }

    #[test]
    fn test_binary_hint_ends() {
        let hint = UnaryHint::restricted(gt(5.0)).with_var("x", Value::name("a"));
        let binary = hint.as_first_of_binary();
        assert_eq!(binary.first(), &gt(5.0));
        assert!(binary.second().is_everything());
        let reversed = binary.reverse();
        assert_eq!(reversed.second(), &gt(5.0));
        assert_eq!(reversed.second_as_unary().vars().len(), 1);
        assert!(hint.as_second_of_binary().first().is_everything());
    }

    #[test]
    fn test_unrestricted_unary_keeps_vars() {
        let hint = UnaryHint::restricted(gt(5.0)).with_var("x", Value::name("a"));
        let open = hint.unrestricted_unary();
        assert!(open.is_unrestricted());
        assert_eq!(open.vars().single_bound(), Some(("x", &Value::name("a"))));
    }
}
