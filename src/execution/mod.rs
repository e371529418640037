//! Query execution engine.
//!
//! The [`Executor`] evaluates a formula against a [`KnowledgeGraph`] and
//! always produces a [`Response`]: evaluation failures become
//! [`Answer::Error`] values instead of escaping as errors.
//!
//! ```text
//! text ──parse──▶ Formula ──beta_reduce──▶ Formula ──Evaluator──▶ UnaryDenotation ──▶ Answer
//!                                                        │
//!                                                        └─ notUnary + execute_binary ──▶ BinaryDenotation ──▶ Answer
//! ```

pub mod cache;
mod eval;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::formula::{self, Formula};
use crate::model::Answer;
use crate::rewrite;
use crate::storage::KnowledgeGraph;
use crate::{Error, Result};

pub use cache::{CacheKey, ExecutorCache};

// ============================================================================
// Configuration
// ============================================================================

/// Executor options. Deserializable from JSON; missing keys take defaults.
///
/// ```json
/// { "sort_results": false, "superlatives_return_all_top_ties": false }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Cache denotations of closed sub-formulas per graph.
    pub use_cache: bool,
    /// Number of graphs whose cached denotations are kept.
    pub cache_max_graphs: usize,
    /// Sort answer lists.
    pub sort_results: bool,
    /// Retry a non-unary root formula as a binary and answer with pairs.
    pub execute_binary: bool,
    /// Answer with a symbolic description instead of failing on infinite results.
    pub allow_implicit_values: bool,
    /// Treat partial date literals as every matching date.
    pub generic_date_values: bool,
    /// Allow `<`, `>`, superlatives and min/max over strings.
    pub allow_string_comparison: bool,
    /// `(!= v)` only admits values of the same kind as `v`.
    pub neq_type_check: bool,
    /// An empty final answer is an `emptyList` error.
    pub fail_on_empty_lists: bool,
    /// `argmax 1 1` / `argmin 1 1` return every entity tied at the top.
    pub superlatives_return_all_top_ties: bool,
    pub aggregates_fail_on_empty_lists: bool,
    pub superlatives_fail_on_empty_lists: bool,
    pub arithmetics_fail_on_empty_lists: bool,
    /// Arithmetic fails when both operands have more than one value.
    pub arithmetics_fail_on_multiple_elements: bool,
    /// Executions slower than this are logged at info level.
    pub slow_execution_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            cache_max_graphs: 1,
            sort_results: true,
            execute_binary: false,
            allow_implicit_values: false,
            generic_date_values: false,
            allow_string_comparison: false,
            neq_type_check: true,
            fail_on_empty_lists: false,
            superlatives_return_all_top_ties: true,
            aggregates_fail_on_empty_lists: false,
            superlatives_fail_on_empty_lists: false,
            arithmetics_fail_on_empty_lists: false,
            arithmetics_fail_on_multiple_elements: true,
            slow_execution_ms: 1000,
        }
    }
}

impl ExecutorConfig {
    /// Every empty-list policy turned into an error.
    pub fn strict() -> Self {
        Self {
            fail_on_empty_lists: true,
            aggregates_fail_on_empty_lists: true,
            superlatives_fail_on_empty_lists: true,
            arithmetics_fail_on_empty_lists: true,
            ..Self::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Unknown(format!("Invalid executor config: {e}")))
    }

    /// The options that change what a sub-formula denotes. Two configs with
    /// the same fingerprint compute identical denotations; options that only
    /// shape the final answer are left out.
    pub fn fingerprint(&self) -> ConfigFingerprint {
        let flags = [
            self.generic_date_values,
            self.allow_string_comparison,
            self.neq_type_check,
            self.superlatives_return_all_top_ties,
            self.aggregates_fail_on_empty_lists,
            self.superlatives_fail_on_empty_lists,
            self.arithmetics_fail_on_empty_lists,
            self.arithmetics_fail_on_multiple_elements,
        ];
        ConfigFingerprint(flags.iter().enumerate().fold(0, |bits, (i, flag)| bits | (u16::from(*flag) << i)))
    }
}

/// Bitmask of the evaluation options in an [`ExecutorConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfigFingerprint(u16);

// ============================================================================
// Response and statistics
// ============================================================================

/// Outcome of one execution.
#[derive(Debug, Clone)]
pub struct Response {
    /// The answer; an [`Answer::Error`] when evaluation failed.
    pub value: Answer,
    /// The failure behind an error answer.
    pub error: Option<Error>,
    pub elapsed: Duration,
}

impl Response {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn into_result(self) -> Result<Answer> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.value),
        }
    }
}

/// Cumulative executor statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionStats {
    pub executions: u64,
    pub errors: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub slow_executions: u64,
    pub total_time: Duration,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    executions: AtomicU64,
    errors: AtomicU64,
    pub(crate) cache_hits: AtomicU64,
    pub(crate) cache_misses: AtomicU64,
    slow_executions: AtomicU64,
    total_micros: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

// ============================================================================
// Executor
// ============================================================================

/// Evaluates formulas. Cheap to share across threads; the cache is
/// internally synchronized.
#[derive(Debug)]
pub struct Executor {
    config: ExecutorConfig,
    cache: Arc<ExecutorCache>,
    counters: Counters,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        let cache = Arc::new(ExecutorCache::new(config.cache_max_graphs));
        Self::with_cache(config, cache)
    }

    /// Share a cache between executors.
    pub fn with_cache(config: ExecutorConfig, cache: Arc<ExecutorCache>) -> Self {
        Self { config, cache, counters: Counters::default() }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ExecutorCache> {
        &self.cache
    }

    /// Evaluate `formula` against `graph`.
    pub fn execute<G>(&self, formula: &Formula, graph: &G) -> Response
    where
        G: KnowledgeGraph + ?Sized,
    {
        let start = Instant::now();
        let reduced = rewrite::beta_reduce(formula);
        let cache = self.config.use_cache.then_some(self.cache.as_ref());
        let result = eval::Evaluator::new(&self.config, cache, graph, &self.counters).run(&reduced);
        self.finish(formula, result, start)
    }

    /// Parse and evaluate. A syntax error becomes an `invalidFormula` answer.
    pub fn execute_str<G>(&self, text: &str, graph: &G) -> Response
    where
        G: KnowledgeGraph + ?Sized,
    {
        match formula::parse(text) {
            Ok(formula) => self.execute(&formula, graph),
            Err(err) => {
                tracing::debug!(error = %err, "Rejected formula text");
                Counters::bump(&self.counters.executions);
                Counters::bump(&self.counters.errors);
                Response { value: Answer::from_error(&err), error: Some(err), elapsed: Duration::ZERO }
            }
        }
    }

    /// Evaluate and surface failures as `Err`.
    pub fn execute_strict<G>(&self, formula: &Formula, graph: &G) -> Result<Answer>
    where
        G: KnowledgeGraph + ?Sized,
    {
        self.execute(formula, graph).into_result()
    }

    fn finish(&self, formula: &Formula, result: Result<Answer>, start: Instant) -> Response {
        let elapsed = start.elapsed();
        Counters::bump(&self.counters.executions);
        self.counters
            .total_micros
            .fetch_add(u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX), Ordering::Relaxed);
        if elapsed >= Duration::from_millis(self.config.slow_execution_ms) {
            Counters::bump(&self.counters.slow_executions);
            tracing::info!(%formula, elapsed_ms = elapsed.as_millis() as u64, "Slow execution");
        }
        match result {
            Ok(value) => {
                tracing::debug!(%formula, answer = %value, "Executed");
                Response { value, error: None, elapsed }
            }
            Err(err) => {
                Counters::bump(&self.counters.errors);
                tracing::debug!(%formula, error = %err, "Execution failed");
                Response { value: Answer::from_error(&err), error: Some(err), elapsed }
            }
        }
    }

    pub fn stats(&self) -> ExecutionStats {
        let c = &self.counters;
        ExecutionStats {
            executions: c.executions.load(Ordering::Relaxed),
            errors: c.errors.load(Ordering::Relaxed),
            cache_hits: c.cache_hits.load(Ordering::Relaxed),
            cache_misses: c.cache_misses.load(Ordering::Relaxed),
            slow_executions: c.slow_executions.load(Ordering::Relaxed),
            total_time: Duration::from_micros(c.total_micros.load(Ordering::Relaxed)),
        }
    }

    /// Emit the cumulative statistics at info level.
    pub fn log_stats(&self) {
        let stats = self.stats();
        tracing::info!(
            executions = stats.executions,
            errors = stats.errors,
            cache_hits = stats.cache_hits,
            cache_misses = stats.cache_misses,
            slow = stats.slow_executions,
            total_ms = stats.total_time.as_millis() as u64,
            "Executor statistics"
        );
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}
