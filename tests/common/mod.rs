//! Shared fixtures for the end-to-end tests.

#![allow(dead_code)]

use lambda_dcs::{Answer, ErrorKind, Executor, ExecutorConfig, TripleGraph, Value};

/// Six people with birthplaces, weights and professions.
pub fn prez() -> TripleGraph {
    TripleGraph::from_lisp(
        "(graph
           (barack_obama place_of_birth honolulu)
           (george_bush place_of_birth new_haven)
           (bill_clinton place_of_birth hope_arkansas)
           (nicole_kidman place_of_birth honolulu)
           (morgan_freeman place_of_birth memphis)
           (ronald_reagan place_of_birth tampico)

           (barack_obama weight_kg (number 82))
           (george_bush weight_kg (number 86))
           (bill_clinton weight_kg (number 100))
           (nicole_kidman weight_kg (number 58))
           (morgan_freeman weight_kg (number 91))
           (ronald_reagan weight_kg (number 82))

           (honolulu containedby hawaii)
           (new_haven containedby connecticut)
           (hope_arkansas containedby arkansas)
           (memphis containedby tennessee)
           (tampico containedby illinois)

           (barack_obama profession politician)
           (george_bush profession politician)
           (bill_clinton profession politician)
           (ronald_reagan profession politician)
           (ronald_reagan profession actor)
           (nicole_kidman profession actor)
           (morgan_freeman profession actor))",
    )
    .expect("prez graph parses")
}

pub fn run(executor: &Executor, graph: &TripleGraph, formula: &str) -> Answer {
    executor.execute_str(formula, graph).value
}

pub fn run_default(graph: &TripleGraph, formula: &str) -> Answer {
    run(&Executor::new(ExecutorConfig::default()), graph, formula)
}

/// Sorted list of names.
pub fn names(ids: &[&str]) -> Answer {
    let mut values: Vec<Value> = ids.iter().map(|id| Value::name(*id)).collect();
    values.sort();
    Answer::List(values)
}

pub fn number(x: f64) -> Answer {
    Answer::List(vec![Value::number(x)])
}

pub fn error_kind(answer: &Answer) -> ErrorKind {
    answer.error_kind().unwrap_or_else(|| panic!("expected an error, got {answer}"))
}
