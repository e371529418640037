//! End-to-end tests for lambda abstraction, reversal and mark.

mod common;

use common::*;
use lambda_dcs::{ErrorKind, Executor, ExecutorConfig, Value};
use pretty_assertions::assert_eq;

fn binary_executor() -> Executor {
    Executor::new(ExecutorConfig { execute_binary: true, ..ExecutorConfig::default() })
}

// ============================================================================
// Applied lambdas
// ============================================================================

#[test]
fn test_applied_lambda_is_beta_reduced() {
    let answer = run_default(&prez(), "((lambda x (place_of_birth (var x))) honolulu)");
    assert_eq!(answer, names(&["barack_obama", "nicole_kidman"]));
}

#[test]
fn test_reversed_lambda_joined_with_entity() {
    let answer = run_default(&prez(), "((reverse (lambda x (place_of_birth (var x)))) barack_obama)");
    assert_eq!(answer, names(&["honolulu"]));
}

#[test]
fn test_reversed_lambda_restricted_by_left_conjunct() {
    let answer = run_default(
        &prez(),
        "(and (!place_of_birth *) ((reverse (lambda x (place_of_birth (var x)))) barack_obama))",
    );
    assert_eq!(answer, names(&["honolulu"]));
}

#[test]
fn test_reversed_lambda_restricted_by_right_conjunct() {
    let answer = run_default(
        &prez(),
        "(and ((reverse (lambda x (place_of_birth (var x)))) barack_obama) (!place_of_birth *))",
    );
    assert_eq!(answer, names(&["honolulu"]));
}

#[test]
fn test_argmax_over_lambda_degree() {
    let answer = run_default(
        &prez(),
        "(argmax 1 1 (containedby *) (reverse (lambda x (count (place_of_birth (var x))))))",
    );
    assert_eq!(answer, names(&["honolulu"]));
}

// ============================================================================
// Floating lambdas (binary answers)
// ============================================================================

#[test]
fn test_floating_lambda_needs_execute_binary() {
    let answer = run_default(&prez(), "(lambda x (place_of_birth (var x)))");
    assert_eq!(error_kind(&answer), ErrorKind::NotUnary);
}

#[test]
fn test_floating_lambda_as_pairs() {
    let answer = run(&binary_executor(), &prez(), "(lambda x (place_of_birth (var x)))");
    let pairs = answer.pairs().expect("pair list");
    assert_eq!(pairs.len(), 6);
    assert!(pairs.contains(&(Value::name("barack_obama"), Value::name("honolulu"))));
    assert!(pairs.contains(&(Value::name("ronald_reagan"), Value::name("tampico"))));
}

#[test]
fn test_floating_lambda_over_reversed_relation() {
    let answer = run(&binary_executor(), &prez(), "(lambda x ((reverse place_of_birth) (var x)))");
    let pairs = answer.pairs().expect("pair list");
    assert_eq!(pairs.len(), 6);
    assert!(pairs.contains(&(Value::name("honolulu"), Value::name("nicole_kidman"))));
}

#[test]
fn test_floating_lambda_without_bound_is_infinite() {
    let answer = run(&binary_executor(), &prez(), "(lambda x (count ((reverse place_of_birth) (var x))))");
    assert_eq!(error_kind(&answer), ErrorKind::InfiniteList);
}

#[test]
fn test_relation_name_as_binary_answer() {
    let answer = run(&binary_executor(), &prez(), "(reverse containedby)");
    let pairs = answer.pairs().expect("pair list");
    assert_eq!(pairs.len(), 5);
    assert!(pairs.contains(&(Value::name("hawaii"), Value::name("honolulu"))));
}

// ============================================================================
// Variables and mark
// ============================================================================

#[test]
fn test_unbound_variable_is_invalid() {
    let answer = run_default(&prez(), "(place_of_birth (var y))");
    assert_eq!(error_kind(&answer), ErrorKind::InvalidFormula);
}

fn likes() -> lambda_dcs::TripleGraph {
    lambda_dcs::TripleGraph::from_lisp(
        "(graph
           (alice likes alice)
           (alice likes bob)
           (bob likes carol)
           (carol likes carol)
           (alice type person) (bob type person) (carol type person))",
    )
    .unwrap()
}

#[test]
fn test_mark_keeps_self_related_candidates() {
    // people who like themselves
    let answer = run_default(&likes(), "(and (type person) (mark x (likes (var x))))");
    assert_eq!(answer, names(&["alice", "carol"]));
}

#[test]
fn test_mark_uses_variable_bound_by_filter() {
    // no upper bound reaches the mark; its candidate is the lambda's x
    let answer = run_default(&likes(), "(filter (type person) (lambda x (mark x (likes (var x)))))");
    assert_eq!(answer, names(&["alice", "carol"]));
}

#[test]
fn test_mark_uses_variable_bound_by_superlative_degree() {
    let answer = run_default(
        &likes(),
        "(argmax 1 1 (type person) (reverse (lambda x (count (mark x (likes (var x)))))))",
    );
    assert_eq!(answer, names(&["alice", "carol"]));
}

#[test]
fn test_mark_without_candidates_is_infinite() {
    let answer = run_default(&prez(), "(mark x (place_of_birth (var x)))");
    assert_eq!(error_kind(&answer), ErrorKind::InfiniteList);
}
