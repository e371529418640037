//! In-memory triple store.
//!
//! This is the reference implementation of `KnowledgeGraph`.
//! Triples are grouped per relation with first/second value indexes.
//!
//! ## Limitations
//!
//! - **Immutable**: the graph is fixed at construction. Build a new
//!   `TripleGraph` (with a new `GraphId`) to change it.
//! - **Infinite candidate sets scan**: a comparator or `*` candidate set
//!   walks every triple of the relation; explicit sets use the indexes.
//!
//! Use this backend for:
//! - Testing the evaluator and executor
//! - Embedding small graphs loaded from `(graph (s r o) ...)` text

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::denotation::UnaryDenotation;
use crate::formula::{self, SExpr};
use crate::model::Value;
use crate::{Error, Result};
use super::{is_reversed, reverse_relation, GraphId, KnowledgeGraph};

/// A `(first, relation, second)` fact.
#[derive(Debug, Clone, PartialEq)]
pub struct Triple {
    pub first: Value,
    pub relation: String,
    pub second: Value,
}

impl Triple {
    pub fn new(first: impl Into<Value>, relation: impl Into<String>, second: impl Into<Value>) -> Self {
        Self { first: first.into(), relation: relation.into(), second: second.into() }
    }
}

// ============================================================================
// TripleGraph
// ============================================================================

/// In-memory knowledge graph. Cloning shares the same instance and id.
#[derive(Clone)]
pub struct TripleGraph {
    inner: Arc<TripleInner>,
}

struct TripleInner {
    id: GraphId,
    triples: Vec<Triple>,
    relations: HashMap<String, RelationIndex>,
}

/// Positions into `triples` for one relation.
#[derive(Default)]
struct RelationIndex {
    all: Vec<usize>,
    by_first: HashMap<Value, Vec<usize>>,
    by_second: HashMap<Value, Vec<usize>>,
}

impl TripleGraph {
    /// Build from triples. A reversed relation `!r` is stored as `r` with
    /// its ends swapped.
    pub fn new(triples: impl IntoIterator<Item = Triple>) -> Self {
        let triples: Vec<Triple> = triples
            .into_iter()
            .map(|t| {
                if is_reversed(&t.relation) {
                    Triple { first: t.second, relation: reverse_relation(&t.relation), second: t.first }
                } else {
                    t
                }
            })
            .collect();

        let mut relations: HashMap<String, RelationIndex> = HashMap::new();
        for (pos, t) in triples.iter().enumerate() {
            let index = relations.entry(t.relation.clone()).or_default();
            index.all.push(pos);
            index.by_first.entry(t.first.clone()).or_default().push(pos);
            index.by_second.entry(t.second.clone()).or_default().push(pos);
        }

        tracing::debug!(triples = triples.len(), relations = relations.len(), "Loaded triple graph");
        Self {
            inner: Arc::new(TripleInner { id: GraphId::fresh(), triples, relations }),
        }
    }

    /// Parse `(graph (first relation second) ...)`.
    ///
    /// Each element is a value literal: bare atoms are names (or numbers
    /// when numeric), lists are `(number ..)`, `(date ..)`, `(string ..)`.
    pub fn from_lisp(text: &str) -> Result<Self> {
        let tree = formula::read_sexpr(text)?;
        let syntax = |expr: &SExpr, message: &str| Error::SyntaxError {
            position: expr.span().start,
            message: message.into(),
        };
        let items = tree.items().ok_or_else(|| syntax(&tree, "Expected (graph ...)"))?;
        let Some((head, facts)) = items.split_first() else {
            return Err(syntax(&tree, "Expected (graph ...)"));
        };
        if head.atom() != Some("graph") {
            return Err(syntax(head, "Expected (graph ...)"));
        }

        let mut triples = Vec::with_capacity(facts.len());
        for fact in facts {
            let [first, relation, second] = fact.items().unwrap_or_default() else {
                return Err(syntax(fact, "Expected a (first relation second) triple"));
            };
            let relation = match formula::value_from_sexpr(relation)? {
                Value::Name(n) => n.id,
                _ => return Err(syntax(relation, "Relation must be a name")),
            };
            triples.push(Triple {
                first: formula::value_from_sexpr(first)?,
                relation,
                second: formula::value_from_sexpr(second)?,
            });
        }
        Ok(Self::new(triples))
    }

    pub fn triples(&self) -> &[Triple] {
        &self.inner.triples
    }

    pub fn len(&self) -> usize {
        self.inner.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.triples.is_empty()
    }

    /// Forward pairs of `relation` whose first (or second) end is in `candidates`.
    fn matching(&self, relation: &str, candidates: &UnaryDenotation, on_first: bool) -> Result<Vec<(Value, Value)>> {
        let Some(index) = self.inner.relations.get(relation) else {
            return Ok(Vec::new());
        };
        let triples = &self.inner.triples;
        let pair = |pos: usize| (triples[pos].first.clone(), triples[pos].second.clone());

        match candidates.as_explicit() {
            Some(explicit) => {
                let lookup = if on_first { &index.by_first } else { &index.by_second };
                Ok(explicit
                    .uniqued()
                    .values()
                    .iter()
                    .filter_map(|v| lookup.get(v))
                    .flatten()
                    .map(|&pos| pair(pos))
                    .collect())
            }
            None => {
                let mut pairs = Vec::new();
                for &pos in &index.all {
                    let t = &triples[pos];
                    let end = if on_first { &t.first } else { &t.second };
                    if candidates.contains(end)? {
                        pairs.push(pair(pos));
                    }
                }
                Ok(pairs)
            }
        }
    }
}

impl KnowledgeGraph for TripleGraph {
    fn id(&self) -> GraphId {
        self.inner.id
    }

    fn filter_first(&self, relation: &str, firsts: &UnaryDenotation) -> Result<Vec<(Value, Value)>> {
        if is_reversed(relation) {
            let pairs = self.matching(&reverse_relation(relation), firsts, false)?;
            return Ok(pairs.into_iter().map(|(x, y)| (y, x)).collect());
        }
        self.matching(relation, firsts, true)
    }

    fn filter_second(&self, relation: &str, seconds: &UnaryDenotation) -> Result<Vec<(Value, Value)>> {
        if is_reversed(relation) {
            let pairs = self.matching(&reverse_relation(relation), seconds, true)?;
            return Ok(pairs.into_iter().map(|(x, y)| (y, x)).collect());
        }
        self.matching(relation, seconds, false)
    }
}

impl fmt::Debug for TripleGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TripleGraph")
            .field("id", &self.inner.id)
            .field("triples", &self.inner.triples.len())
            .field("relations", &self.inner.relations.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> TripleGraph {
        TripleGraph::from_lisp(
            "(graph
               (obama place_of_birth honolulu)
               (kidman place_of_birth honolulu)
               (bush place_of_birth new_haven)
               (obama weight_kg (number 82))
               (kidman weight_kg (number 58)))",
        )
        .unwrap()
    }

    fn names(ids: &[&str]) -> UnaryDenotation {
        UnaryDenotation::explicit(ids.iter().map(|id| Value::name(*id)))
    }

    #[test]
    fn test_join_second() {
        let people = graph().join_second("place_of_birth", &names(&["honolulu"])).unwrap();
        assert_eq!(people, vec![Value::name("obama"), Value::name("kidman")]);
    }

    #[test]
    fn test_reversed_relation() {
        let places = graph().join_second("!place_of_birth", &names(&["obama", "bush"])).unwrap();
        assert_eq!(places, vec![Value::name("honolulu"), Value::name("new_haven")]);
        let pairs = graph().filter_first("!place_of_birth", &names(&["honolulu"])).unwrap();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|(x, _)| *x == Value::name("honolulu")));
    }

    #[test]
    fn test_everything_scans() {
        let weights = graph().join_first("weight_kg", &UnaryDenotation::Everything).unwrap();
        assert_eq!(weights, vec![Value::number(82.0), Value::number(58.0)]);
    }

    #[test]
    fn test_unknown_relation_is_empty() {
        assert!(graph().join_first("spouse", &UnaryDenotation::Everything).unwrap().is_empty());
    }

    #[test]
    fn test_reversed_triples_are_normalized() {
        let g = TripleGraph::new([Triple::new(Value::name("honolulu"), "!place_of_birth", Value::name("obama"))]);
        assert_eq!(g.triples()[0].relation, "place_of_birth");
        assert_eq!(g.triples()[0].first, Value::name("obama"));
    }

    #[test]
    fn test_bad_graph_text() {
        assert!(TripleGraph::from_lisp("(triples (a r b))").is_err());
        assert!(TripleGraph::from_lisp("(graph (a r))").is_err());
    }

    #[test]
    fn test_clone_shares_identity() {
        let g = graph();
        assert_eq!(g.id(), g.clone().id());
        assert_ne!(g.id(), graph().id());
    }
}
