//! # Knowledge Graph Trait
//!
//! This is THE contract between the evaluator and any graph store.
//! The evaluator only ever asks four questions of a graph, all over a
//! relation name and a (possibly infinite) candidate set.
//!
//! A relation name prefixed with `!` denotes the reverse relation
//! (`!place_of_birth` maps places to people). `!=` is a comparator,
//! not a reversed relation.
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `TripleGraph` | `memory` | In-memory triple store for testing/embedding |

pub mod memory;

use std::sync::atomic::{AtomicU64, Ordering};

use crate::denotation::UnaryDenotation;
use crate::model::Value;
use crate::Result;

pub use memory::TripleGraph;

// ============================================================================
// Graph identity
// ============================================================================

/// Identity of a loaded graph instance. Used as the cache metakey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphId(pub u64);

impl GraphId {
    /// A process-unique id.
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        GraphId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for GraphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "graph#{}", self.0)
    }
}

// ============================================================================
// Relation names
// ============================================================================

/// Prefix marking a reversed relation.
pub const REVERSE_PREFIX: char = '!';

pub fn is_reversed(relation: &str) -> bool {
    relation.starts_with(REVERSE_PREFIX) && relation != "!="
}

/// Toggle the reverse prefix: `r` ↔ `!r`.
pub fn reverse_relation(relation: &str) -> String {
    if relation == "!=" {
        relation.to_string()
    } else if let Some(base) = relation.strip_prefix(REVERSE_PREFIX) {
        base.to_string()
    } else {
        format!("{REVERSE_PREFIX}{relation}")
    }
}

// ============================================================================
// The Trait
// ============================================================================

/// A fixed, already-loaded graph of `(first, relation, second)` triples.
///
/// Implementations must be read-only, safe for concurrent reads, and
/// return results in a deterministic order for identical inputs (the
/// executor caches by graph identity).
pub trait KnowledgeGraph: Send + Sync {
    /// Identity of this graph instance.
    fn id(&self) -> GraphId;

    /// All `(x, y)` with `x` in `firsts` and `(x, relation, y)` in the graph.
    fn filter_first(&self, relation: &str, firsts: &UnaryDenotation) -> Result<Vec<(Value, Value)>>;

    /// All `(x, y)` with `y` in `seconds` and `(x, relation, y)` in the graph.
    fn filter_second(&self, relation: &str, seconds: &UnaryDenotation) -> Result<Vec<(Value, Value)>>;

    /// All `y` with `x` in `firsts` and `(x, relation, y)` in the graph.
    ///
    /// Default: projects [`filter_first`](Self::filter_first).
    fn join_first(&self, relation: &str, firsts: &UnaryDenotation) -> Result<Vec<Value>> {
        Ok(self.filter_first(relation, firsts)?.into_iter().map(|(_, y)| y).collect())
    }

    /// All `x` with `y` in `seconds` and `(x, relation, y)` in the graph.
    ///
    /// Default: projects [`filter_second`](Self::filter_second).
    fn join_second(&self, relation: &str, seconds: &UnaryDenotation) -> Result<Vec<Value>> {
        Ok(self.filter_second(relation, seconds)?.into_iter().map(|(x, _)| x).collect())
    }
}
