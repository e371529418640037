//! Superlatives and arithmetic over explicit denotations.

use crate::execution::ExecutorConfig;
use crate::formula::{ArithmeticMode, SuperlativeMode};
use crate::model::Value;
use crate::{Error, Result};
use super::{Processor, UnaryDenotation};

/// Rank entities by degree.
///
/// `pairs` are `(degree, entity)`. Returns the entities ranked
/// `rank..rank + count` (1-based), or every entity tied at the top when
/// `rank == count == 1` and top ties are enabled.
pub fn superlative(
    mode: SuperlativeMode,
    rank: usize,
    count: usize,
    pairs: &[(Value, Value)],
    config: &ExecutorConfig,
) -> Result<UnaryDenotation> {
    if rank == 0 || count == 0 {
        return Err(Error::TypeMismatch(format!(
            "Invalid {} (rank = {rank}, count = {count})",
            mode.keyword()
        )));
    }
    if pairs.is_empty() {
        if config.superlatives_fail_on_empty_lists {
            return Err(Error::EmptyList(format!("Cannot call {} on an empty list", mode.keyword())));
        }
        return Ok(UnaryDenotation::empty());
    }

    let degrees: Vec<Value> = pairs.iter().map(|(degree, _)| degree.clone()).collect();
    let processor = Processor::select(&degrees, config.allow_string_comparison)?;

    if config.superlatives_return_all_top_ties && rank == 1 && count == 1 {
        let top = match mode {
            SuperlativeMode::Argmax => processor.max(&degrees)?,
            SuperlativeMode::Argmin => processor.min(&degrees)?,
        };
        let mut winners: Vec<Value> = Vec::new();
        for (degree, entity) in pairs {
            if *degree == top && !winners.contains(entity) {
                winners.push(entity.clone());
            }
        }
        return Ok(UnaryDenotation::explicit(winners));
    }

    let mut indices = processor.argsort(&degrees)?;
    if mode == SuperlativeMode::Argmax {
        indices.reverse();
    }
    let from = (rank - 1).min(indices.len());
    let to = from.saturating_add(count).min(indices.len());
    Ok(UnaryDenotation::explicit(indices[from..to].iter().map(|&i| pairs[i].1.clone())))
}

/// Cartesian arithmetic over two finite operands.
pub fn arithmetic(
    mode: ArithmeticMode,
    left: &UnaryDenotation,
    right: &UnaryDenotation,
    config: &ExecutorConfig,
) -> Result<UnaryDenotation> {
    let (lhs, rhs) = (left.values()?, right.values()?);
    if lhs.is_empty() || rhs.is_empty() {
        if config.arithmetics_fail_on_empty_lists {
            return Err(Error::EmptyList(format!("Cannot call {} on an empty list", mode.keyword())));
        }
        return Ok(UnaryDenotation::empty());
    }
    if config.arithmetics_fail_on_multiple_elements && lhs.len() > 1 && rhs.len() > 1 {
        return Err(Error::NonSingletonList(format!(
            "Cannot call {} when both operands have more than one value",
            mode.keyword()
        )));
    }
    let processor = Processor::select(lhs.iter().chain(rhs), config.allow_string_comparison)?;
    let mut results = Vec::with_capacity(lhs.len() * rhs.len());
    for a in lhs {
        for b in rhs {
            results.push(processor.apply(mode, a, b)?);
        }
    }
    Ok(UnaryDenotation::explicit(results))
}
