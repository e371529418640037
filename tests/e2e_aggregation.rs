//! End-to-end tests for aggregates and superlatives, including tie and
//! empty-list policies.

mod common;

use common::*;
use lambda_dcs::{Answer, ErrorKind, Executor, ExecutorConfig, TripleGraph, Value};
use pretty_assertions::assert_eq;

fn scores() -> TripleGraph {
    TripleGraph::from_lisp(
        "(graph
           (a score (number 5))
           (b score (number 5))
           (c score (number 3))
           (a type player) (b type player) (c type player) (d type player))",
    )
    .unwrap()
}

fn with(config: ExecutorConfig) -> Executor {
    Executor::new(config)
}

// ============================================================================
// Aggregates
// ============================================================================

#[test]
fn test_sum_and_max() {
    assert_eq!(run_default(&prez(), "(sum (!weight_kg *))"), number(499.0));
    assert_eq!(run_default(&prez(), "(max (!weight_kg *))"), number(100.0));
    assert_eq!(run_default(&prez(), "(min (!weight_kg *))"), number(58.0));
}

#[test]
fn test_avg() {
    assert_eq!(run_default(&scores(), "(avg (!score (type player)))"), number(13.0 / 3.0));
}

#[test]
fn test_count_is_deduplicated() {
    // two people share 82 kg, so there are five distinct weights
    assert_eq!(run_default(&prez(), "(count (!weight_kg *))"), number(5.0));
    assert_eq!(run_default(&prez(), "(count (!place_of_birth *))"), number(5.0));
}

#[test]
fn test_count_of_empty_is_zero() {
    assert_eq!(run_default(&prez(), "(count (place_of_birth atlantis))"), number(0.0));
}

#[test]
fn test_count_of_infinite_fails() {
    assert_eq!(error_kind(&run_default(&prez(), "(count *)")), ErrorKind::InfiniteList);
}

#[test]
fn test_min_of_closed_comparison() {
    assert_eq!(run_default(&prez(), "(min (>= (number 3)))"), number(3.0));
    assert_eq!(error_kind(&run_default(&prez(), "(max (>= (number 3)))")), ErrorKind::InfiniteList);
}

#[test]
fn test_aggregate_of_names_is_type_mismatch() {
    let answer = run_default(&prez(), "(sum (!profession *))");
    assert_eq!(error_kind(&answer), ErrorKind::TypeMismatch);
}

#[test]
fn test_empty_aggregate_policy() {
    let formula = "(sum (!weight_kg (place_of_birth atlantis)))";
    assert_eq!(run_default(&prez(), formula), Answer::List(vec![]));
    let strict = with(ExecutorConfig { aggregates_fail_on_empty_lists: true, ..ExecutorConfig::default() });
    assert_eq!(error_kind(&run(&strict, &prez(), formula)), ErrorKind::EmptyList);
}

#[test]
fn test_fail_on_empty_final_answer() {
    let strict = with(ExecutorConfig::strict());
    assert_eq!(error_kind(&run(&strict, &prez(), "(place_of_birth atlantis)")), ErrorKind::EmptyList);
}

// ============================================================================
// Superlatives
// ============================================================================

#[test]
fn test_argmax_weight() {
    assert_eq!(run_default(&prez(), "(argmax 1 1 * weight_kg)"), names(&["bill_clinton"]));
    assert_eq!(run_default(&prez(), "(argmin 1 1 * weight_kg)"), names(&["nicole_kidman"]));
}

#[test]
fn test_argmax_restricted_head() {
    let answer = run_default(&prez(), "(argmax 1 1 (profession actor) weight_kg)");
    assert_eq!(answer, names(&["morgan_freeman"]));
}

#[test]
fn test_top_ties_returned() {
    let answer = run_default(&scores(), "(argmax 1 1 (type player) score)");
    assert_eq!(answer, names(&["a", "b"]));
}

#[test]
fn test_single_winner_when_ties_disabled() {
    let single = with(ExecutorConfig { superlatives_return_all_top_ties: false, ..ExecutorConfig::default() });
    assert_eq!(run(&single, &scores(), "(argmax 1 1 (type player) score)"), names(&["b"]));
    assert_eq!(run(&single, &scores(), "(argmin 2 1 (type player) score)"), names(&["a"]));
}

#[test]
fn test_rank_and_count_window() {
    let answer = run_default(&scores(), "(argmin 1 2 (type player) score)");
    assert_eq!(answer, names(&["c", "a"]));
    let past_end = run_default(&scores(), "(argmax 9 1 (type player) score)");
    assert_eq!(past_end, Answer::List(vec![]));
}

#[test]
fn test_invalid_rank() {
    let answer = run_default(&scores(), "(argmax 0 1 (type player) score)");
    assert_eq!(error_kind(&answer), ErrorKind::TypeMismatch);
    let answer = run_default(&scores(), "(argmax (!score (type player)) 1 (type player) score)");
    assert_eq!(error_kind(&answer), ErrorKind::NonSingletonList);
}

#[test]
fn test_empty_superlative_policy() {
    let formula = "(argmax 1 1 (type coach) score)";
    assert_eq!(run_default(&scores(), formula), Answer::List(vec![]));
    let strict = with(ExecutorConfig { superlatives_fail_on_empty_lists: true, ..ExecutorConfig::default() });
    assert_eq!(error_kind(&run(&strict, &scores(), formula)), ErrorKind::EmptyList);
}

#[test]
fn test_superlative_skips_entities_without_degree() {
    // d has no score and never competes
    let answer = run_default(&scores(), "(argmin 1 10 (type player) score)");
    assert_eq!(answer.values().map(<[Value]>::len), Some(3));
}
