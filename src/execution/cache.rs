//! Denotation cache shared across executions.
//!
//! Entries are grouped by graph identity (the metakey). Only the most
//! recently used `max_graphs` graphs keep their entries; touching any entry
//! of a graph marks that graph as most recent. Within a graph, entries are
//! keyed by the [`ConfigFingerprint`] of the executor that computed them, so
//! executors with different evaluation options can share one cache.

use std::num::NonZeroUsize;
use std::sync::Arc;

use hashbrown::HashMap;
use lru::LruCache;
use parking_lot::Mutex;

use crate::denotation::UnaryDenotation;
use crate::formula::Formula;
use crate::model::Value;
use crate::storage::GraphId;

use super::ConfigFingerprint;

/// What a cached denotation was computed for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A closed formula, no variables in scope.
    Formula(Formula),
    /// A lambda body evaluated with its single variable bound to a value.
    Scoped(Formula, String, Value),
}

type GraphEntries = HashMap<ConfigFingerprint, HashMap<CacheKey, Arc<UnaryDenotation>>>;

pub struct ExecutorCache {
    graphs: Mutex<LruCache<GraphId, GraphEntries>>,
}

impl ExecutorCache {
    /// A cache keeping entries for at most `max_graphs` graphs (at least one).
    pub fn new(max_graphs: usize) -> Self {
        let capacity = NonZeroUsize::new(max_graphs).unwrap_or(NonZeroUsize::MIN);
        Self { graphs: Mutex::new(LruCache::new(capacity)) }
    }

    pub fn max_graphs(&self) -> usize {
        self.graphs.lock().cap().get()
    }

    pub fn get(&self, graph: GraphId, config: ConfigFingerprint, key: &CacheKey) -> Option<Arc<UnaryDenotation>> {
        let mut graphs = self.graphs.lock();
        // `get_mut` promotes the graph even when the key misses.
        graphs.get_mut(&graph)?.get(&config)?.get(key).cloned()
    }

    pub fn put(&self, graph: GraphId, config: ConfigFingerprint, key: CacheKey, denotation: Arc<UnaryDenotation>) {
        let mut graphs = self.graphs.lock();
        if let Some(entries) = graphs.get_mut(&graph) {
            entries.entry(config).or_default().insert(key, denotation);
            return;
        }
        let mut entries = GraphEntries::new();
        entries.entry(config).or_default().insert(key, denotation);
        if let Some((evicted, _)) = graphs.push(graph, entries) {
            tracing::debug!(graph = %evicted, "Evicted cached denotations");
        }
    }

    /// Total number of cached entries.
    pub fn len(&self) -> usize {
        self.graphs.lock().iter().flat_map(|(_, entries)| entries.values()).map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of graphs currently holding entries.
    pub fn metakey_count(&self) -> usize {
        self.graphs.lock().len()
    }

    pub fn contains_graph(&self, graph: GraphId) -> bool {
        self.graphs.lock().contains(&graph)
    }

    pub fn clear(&self) {
        self.graphs.lock().clear();
    }
}

impl Default for ExecutorCache {
    fn default() -> Self {
        Self::new(1)
    }
}

impl std::fmt::Debug for ExecutorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorCache")
            .field("max_graphs", &self.max_graphs())
            .field("graphs", &self.metakey_count())
            .field("entries", &self.len())
            .finish()
    }
}
