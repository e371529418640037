//! Property tests for denotation algebra, formula reversal and graph joins.

use std::collections::{BTreeSet, HashSet};

use lambda_dcs::rewrite::reverse_formula;
use lambda_dcs::{Answer, Executor, Formula, MergeMode, TripleGraph, UnaryDenotation, Value};
use proptest::prelude::*;

fn entity(i: u8) -> Value {
    Value::name(format!("e{i}"))
}

fn set_of(d: &UnaryDenotation) -> HashSet<Value> {
    d.values().expect("explicit denotation").iter().cloned().collect()
}

fn explicit_strategy() -> impl Strategy<Value = UnaryDenotation> {
    prop::collection::vec(0u8..8, 0..10).prop_map(|ids| UnaryDenotation::explicit(ids.into_iter().map(entity)))
}

fn graph_strategy() -> impl Strategy<Value = Vec<(u8, u8)>> {
    prop::collection::vec((0u8..6, 0u8..6), 0..20)
}

fn build_graph(edges: &[(u8, u8)]) -> TripleGraph {
    let body: String = edges.iter().map(|(a, b)| format!("(e{a} r e{b}) ")).collect();
    TripleGraph::from_lisp(&format!("(graph {body})")).expect("generated graph parses")
}

fn sorted_answer(values: BTreeSet<Value>) -> Answer {
    Answer::List(values.into_iter().collect())
}

proptest! {
    #[test]
    fn prop_relation_reverse_is_involution(id in "[a-z][a-z_]{0,7}", reversed in any::<bool>()) {
        let id = if reversed { format!("!{id}") } else { id };
        let formula = Formula::name(id);
        prop_assert_eq!(reverse_formula(&reverse_formula(&formula)), formula);
    }

    #[test]
    fn prop_comparator_reverse_is_involution(symbol in prop::sample::select(vec!["<", ">", "<=", ">=", "!="])) {
        let formula = Formula::name(symbol);
        prop_assert_eq!(reverse_formula(&reverse_formula(&formula)), formula);
    }

    #[test]
    fn prop_explicit_merge_is_commutative(a in explicit_strategy(), b in explicit_strategy()) {
        for mode in [MergeMode::And, MergeMode::Or] {
            let ab = a.merge(&b, mode).unwrap();
            let ba = b.merge(&a, mode).unwrap();
            prop_assert_eq!(set_of(&ab), set_of(&ba));
        }
    }

    #[test]
    fn prop_explicit_merge_is_idempotent(a in explicit_strategy()) {
        for mode in [MergeMode::And, MergeMode::Or] {
            prop_assert_eq!(set_of(&a.merge(&a, mode).unwrap()), set_of(&a));
        }
    }

    #[test]
    fn prop_and_is_intersection(a in explicit_strategy(), b in explicit_strategy()) {
        let both = a.merge(&b, MergeMode::And).unwrap();
        let expected: HashSet<Value> = set_of(&a).intersection(&set_of(&b)).cloned().collect();
        prop_assert_eq!(set_of(&both), expected);
        prop_assert_eq!(both.len(), both.uniqued().len());
    }

    #[test]
    fn prop_and_with_everything_is_identity(a in explicit_strategy()) {
        let merged = UnaryDenotation::Everything.merge(&a, MergeMode::And).unwrap();
        prop_assert_eq!(set_of(&merged), set_of(&a));
    }

    #[test]
    fn prop_join_matches_naive_scan(edges in graph_strategy(), target in 0u8..6) {
        let graph = build_graph(&edges);
        let answer = Executor::default().execute_str(&format!("(r e{target})"), &graph).value;
        let expected: BTreeSet<Value> =
            edges.iter().filter(|(_, b)| *b == target).map(|(a, _)| entity(*a)).collect();
        prop_assert_eq!(answer, sorted_answer(expected));
    }

    #[test]
    fn prop_reverse_join_matches_naive_scan(edges in graph_strategy(), source in 0u8..6) {
        let graph = build_graph(&edges);
        let answer = Executor::default().execute_str(&format!("(!r e{source})"), &graph).value;
        let expected: BTreeSet<Value> =
            edges.iter().filter(|(a, _)| *a == source).map(|(_, b)| entity(*b)).collect();
        prop_assert_eq!(answer, sorted_answer(expected));
    }

    #[test]
    fn prop_count_is_distinct_seconds(edges in graph_strategy()) {
        let graph = build_graph(&edges);
        let answer = Executor::default().execute_str("(count (!r *))", &graph).value;
        let distinct: BTreeSet<u8> = edges.iter().map(|(_, b)| *b).collect();
        prop_assert_eq!(answer, Answer::List(vec![Value::number(distinct.len() as f64)]));
    }

    #[test]
    fn prop_and_keeps_subset_of_left(edges in graph_strategy(), base in prop::collection::btree_set(0u8..6, 0..6)) {
        let graph = build_graph(&edges);
        let base_formula = base.iter().map(|i| format!("e{i}")).fold(None, |acc: Option<String>, e| {
            Some(match acc {
                None => e,
                Some(acc) => format!("(or {acc} {e})"),
            })
        });
        let Some(base_formula) = base_formula else { return Ok(()) };
        let answer = Executor::default()
            .execute_str(&format!("(and {base_formula} (!r *))"), &graph)
            .value;
        let values = answer.values().expect("list answer");
        let allowed: BTreeSet<Value> = base.iter().map(|i| entity(*i)).collect();
        prop_assert!(values.iter().all(|v| allowed.contains(v)));
    }
}
