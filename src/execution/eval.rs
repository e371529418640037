//! The recursive evaluator.
//!
//! `compute_unary` / `compute_binary` walk the formula tree top-down,
//! passing hints that carry upper bounds and variables. Where a node can be
//! evaluated in more than one order (joins, merges) the evaluator tries the
//! cheap order first and falls back to the other when the first hits an
//! infinite or ill-typed intermediate result.

use std::sync::Arc;

use crate::denotation::{ops, BinaryDenotation, Comparator, UnaryDenotation};
use crate::formula::{Formula, MergeMode};
use crate::hint::{BinaryHint, Lookup, UnaryHint};
use crate::model::{Answer, Value};
use crate::rewrite;
use crate::storage::{GraphId, KnowledgeGraph};
use crate::{Error, ErrorKind, Result};
use super::{CacheKey, ConfigFingerprint, Counters, ExecutorCache, ExecutorConfig};

pub(crate) struct Evaluator<'a, G: ?Sized> {
    config: &'a ExecutorConfig,
    fingerprint: ConfigFingerprint,
    cache: Option<&'a ExecutorCache>,
    graph: &'a G,
    graph_id: GraphId,
    counters: &'a Counters,
}

impl<'a, G> Evaluator<'a, G>
where
    G: KnowledgeGraph + ?Sized,
{
    pub(crate) fn new(
        config: &'a ExecutorConfig,
        cache: Option<&'a ExecutorCache>,
        graph: &'a G,
        counters: &'a Counters,
    ) -> Self {
        Self { config, fingerprint: config.fingerprint(), cache, graph, graph_id: graph.id(), counters }
    }

    /// Evaluate a closed formula to an answer.
    pub(crate) fn run(&self, formula: &Formula) -> Result<Answer> {
        match self.compute_unary(formula, &UnaryHint::unrestricted()) {
            Ok(denotation) => denotation.to_answer(self.config),
            Err(err) if err.kind() == ErrorKind::NotUnary && self.config.execute_binary => {
                tracing::debug!(%formula, "Not a unary, evaluating as a binary");
                self.compute_binary(formula, &BinaryHint::unrestricted())?
                    .to_answer(self.graph, self.config)
            }
            Err(err) => Err(err),
        }
    }

    // ========================================================================
    // Cache
    // ========================================================================

    /// The cache key for `formula` under `hint`, if its result is
    /// determined by the key alone.
    fn cache_key(&self, formula: &Formula, hint: &UnaryHint) -> Option<CacheKey> {
        self.cache?;
        let vars = hint.vars();
        if vars.is_empty() {
            return Some(CacheKey::Formula(formula.clone()));
        }
        vars.single_bound()
            .map(|(name, value)| CacheKey::Scoped(formula.clone(), name.to_string(), value.clone()))
    }

    fn cache_lookup(&self, key: &CacheKey) -> Option<Arc<UnaryDenotation>> {
        let hit = self.cache?.get(self.graph_id, self.fingerprint, key);
        let counter = if hit.is_some() { &self.counters.cache_hits } else { &self.counters.cache_misses };
        counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        hit
    }

    // ========================================================================
    // Unary
    // ========================================================================

    pub(crate) fn compute_unary(&self, formula: &Formula, hint: &UnaryHint) -> Result<UnaryDenotation> {
        tracing::trace!(%formula, %hint, "compute unary");
        let key = self.cache_key(formula, hint);
        if let Some(key) = &key {
            if let Some(cached) = self.cache_lookup(key) {
                tracing::debug!(%formula, "Cache hit");
                return hint.apply_bound((*cached).clone());
            }
        }

        let denotation = self.compute_unary_uncached(formula, hint)?;

        // Only an unrestricted result is the full denotation of the key.
        if let (Some(key), Some(cache), true) = (key, self.cache, hint.is_unrestricted()) {
            cache.put(self.graph_id, self.fingerprint, key, Arc::new(denotation.clone()));
        }
        Ok(denotation)
    }

    fn compute_unary_uncached(&self, formula: &Formula, hint: &UnaryHint) -> Result<UnaryDenotation> {
        match formula {
            Formula::Value(value) => self.value_unary(value, hint),

            Formula::Variable(name) => match hint.vars().get(name)? {
                Lookup::Bound(value) => hint.apply_bound(UnaryDenotation::singleton(value.clone())),
                Lookup::Free => hint.apply_bound(UnaryDenotation::Everything),
            },

            Formula::Join { relation, child } => self.join(relation, child, hint),

            Formula::Merge { mode, left, right } => {
                let merged = self.merge(*mode, left, right, hint).or_else(|first| {
                    tracing::debug!(%formula, error = %first, "Retrying merge right-first");
                    self.merge(*mode, right, left, hint)
                        .map_err(|second| Error::either("Cannot merge", first, second))
                })?;
                hint.apply_bound(merged)
            }

            Formula::Aggregate { mode, child } => {
                let child = self.compute_unary(child, &hint.unrestricted_unary())?;
                hint.apply_bound(child.aggregate(*mode, self.config)?)
            }

            Formula::Superlative { mode, rank, count, head, relation } => {
                let rank = self.compute_unary(rank, &hint.unrestricted_unary())?.single_positive_integer()?;
                let count = self.compute_unary(count, &hint.unrestricted_unary())?.single_positive_integer()?;
                // The ranking must see every candidate; the caller's bound
                // applies to the winners only.
                let head = self.compute_unary(head, &hint.unrestricted_unary())?;
                let vars = hint.vars().clone();
                // Degrees are the firsts of `(degree, entity)` pairs.
                let degrees = match relation.as_ref() {
                    Formula::Reverse(inner) => self.compute_binary(
                        inner,
                        &BinaryHint::new(UnaryDenotation::Everything, head.clone(), vars),
                    )?,
                    relation => self
                        .compute_binary(relation, &BinaryHint::new(head.clone(), UnaryDenotation::Everything, vars))?
                        .reverse(),
                };
                let pairs = degrees.explicitly_filter_second(&head, self.graph)?;
                hint.apply_bound(ops::superlative(*mode, rank, count, &pairs, self.config)?)
            }

            Formula::Arithmetic { mode, left, right } => {
                let left = self.compute_unary(left, &hint.unrestricted_unary())?;
                let right = self.compute_unary(right, &hint.unrestricted_unary())?;
                hint.apply_bound(ops::arithmetic(*mode, &left, &right, self.config)?)
            }

            Formula::Mark { var, body } => self.mark(var, body, hint),

            Formula::Filter { base, relation } => self.filter(base, relation, hint),

            Formula::Lambda { .. } | Formula::Reverse(_) => {
                Err(Error::NotUnary(format!("{formula} denotes a binary")))
            }
        }
    }

    fn value_unary(&self, value: &Value, hint: &UnaryHint) -> Result<UnaryDenotation> {
        if let Some(id) = value.as_name() {
            if id == Formula::EVERYTHING {
                return hint.apply_bound(UnaryDenotation::Everything);
            }
            if Comparator::from_symbol(id).is_some() {
                return Err(Error::NotUnary(format!("Comparator {id} is a binary")));
            }
        }
        if let (true, Value::Date(date)) = (self.config.generic_date_values, value) {
            return hint.apply_bound(UnaryDenotation::generic_date(*date)?);
        }
        hint.apply_bound(UnaryDenotation::singleton(value.clone()))
    }

    /// `(relation child)`.
    fn join(&self, relation: &Formula, child: &Formula, hint: &UnaryHint) -> Result<UnaryDenotation> {
        let child_first = || -> Result<UnaryDenotation> {
            let child = self.compute_unary(child, &hint.unrestricted_unary())?;
            let relation = self.compute_binary(relation, &hint.as_first_of_binary_with_second(child.clone()))?;
            relation.join_second(&child, self.graph, self.config)
        };
        let relation_first = || -> Result<UnaryDenotation> {
            let relation = self.compute_binary(relation, &hint.as_first_of_binary())?;
            let child_bound = relation.join_first(hint.upper_bound(), self.graph, self.config)?;
            let child = self.compute_unary(child, &hint.with_bound(child_bound))?;
            relation.join_second(&child, self.graph, self.config)
        };

        let joined = child_first().or_else(|first| {
            tracing::debug!(%relation, %child, error = %first, "Retrying join relation-first");
            relation_first().map_err(|second| Error::either("Cannot join", first, second))
        })?;
        hint.apply_bound(joined)
    }

    /// One evaluation order of a merge: `first`, then `second` restricted by it.
    fn merge(&self, mode: MergeMode, first: &Formula, second: &Formula, hint: &UnaryHint) -> Result<UnaryDenotation> {
        let first = self.compute_unary(first, hint)?;
        let second_hint = match mode {
            MergeMode::And => hint.restrict(&first)?,
            MergeMode::Or => hint.clone(),
        };
        let second = self.compute_unary(second, &second_hint)?;
        first.merge(&second, mode)
    }

    /// `(mark x body)`: candidates `v` with `v` in `body[x := v]`.
    fn mark(&self, var: &str, body: &Formula, hint: &UnaryHint) -> Result<UnaryDenotation> {
        let candidates = match (hint.vars().get(var), hint.upper_bound().as_explicit()) {
            (Ok(Lookup::Bound(v)), _) => vec![v.clone()],
            (_, Some(bound)) => bound.uniqued().into_values(),
            (_, None) => {
                return Err(Error::InfiniteList(format!(
                    "Cannot enumerate candidates for (mark {var} {body}) under {}",
                    hint.upper_bound()
                )));
            }
        };
        let mut kept = Vec::new();
        for v in &candidates {
            let image = self.compute_unary(body, &hint.unrestricted_unary().with_var(var, v.clone()))?;
            if image.contains(v)? {
                kept.push(v.clone());
            }
        }
        hint.apply_bound(UnaryDenotation::explicit(kept))
    }

    /// `(filter base relation)`: elements of `base` related to a truthy value.
    fn filter(&self, base: &Formula, relation: &Formula, hint: &UnaryHint) -> Result<UnaryDenotation> {
        let base = self.compute_unary(base, hint)?;
        let values = base.values()?;
        let binary = self.compute_binary(
            relation,
            &BinaryHint::new(UnaryDenotation::Everything, base.clone(), hint.vars().clone()),
        )?;
        let pairs = binary.explicitly_filter_second(&base, self.graph)?;
        let satisfied: hashbrown::HashSet<&Value> =
            pairs.iter().filter(|(r, _)| r.is_truthy()).map(|(_, v)| v).collect();
        let kept: Vec<Value> = values.iter().filter(|v| satisfied.contains(v)).cloned().collect();
        hint.apply_bound(UnaryDenotation::explicit(kept))
    }

    // ========================================================================
    // Binary
    // ========================================================================

    pub(crate) fn compute_binary(&self, formula: &Formula, hint: &BinaryHint) -> Result<BinaryDenotation> {
        tracing::trace!(%formula, %hint, "compute binary");
        match formula {
            Formula::Value(value) => match value.as_name() {
                Some(id) if id == Formula::EVERYTHING => {
                    Err(Error::NotBinary(format!("{formula} denotes a unary")))
                }
                Some(id) => Ok(match Comparator::from_symbol(id) {
                    Some(c) => BinaryDenotation::Special(c),
                    None => BinaryDenotation::predicate(id),
                }),
                None => Err(Error::NotBinary(format!("{formula} denotes a unary"))),
            },

            Formula::Reverse(inner) => Ok(self.compute_binary(inner, &hint.reverse())?.reverse()),

            Formula::Lambda { var, body } => self.lambda(var, body, hint),

            Formula::Merge { mode, left, right } => {
                let left = self.compute_binary(left, hint)?;
                let right = self.compute_binary(right, hint)?;
                left.merge(&right, *mode)
            }

            _ => Err(Error::NotBinary(format!("{formula} denotes a unary"))),
        }
    }

    /// Materialize `(lambda var body)` as explicit pairs `(body[var := v], v)`.
    ///
    /// 1. Second end finite: evaluate the body once per value.
    /// 2. First end finite and the body reversible: evaluate the reversed
    ///    body once per first value.
    /// 3. Reversible: the reversed body with `var` free yields the domain,
    ///    then proceed as in 1.
    /// 4. Otherwise the relation cannot be enumerated.
    fn lambda(&self, var: &str, body: &Formula, hint: &BinaryHint) -> Result<BinaryDenotation> {
        let mut failure = None;
        if let Some(seconds) = hint.second().as_explicit() {
            match self.materialize(var, body, seconds.uniqued().values(), &hint.first_as_unary(), false) {
                Ok(pairs) => return Ok(pairs),
                Err(err) => {
                    tracing::debug!(%var, %body, error = %err, "Lambda over seconds failed");
                    failure = Some(err);
                }
            }
        }

        let reversed = match rewrite::reverse_lambda(var, body) {
            Some(Formula::Lambda { body: reversed, .. }) => reversed,
            _ => {
                return Err(failure.unwrap_or_else(|| {
                    Error::InfiniteList(format!("Cannot materialize (lambda {var} {body}) without a finite bound"))
                }));
            }
        };

        let attempt = || -> Result<BinaryDenotation> {
            if let Some(firsts) = hint.first().as_explicit() {
                return self.materialize(var, &reversed, firsts.uniqued().values(), &hint.second_as_unary(), true);
            }
            let domain = self.compute_unary(&reversed, &hint.second_as_unary().with_free_var(var)?)?;
            let domain = domain.uniqued();
            tracing::debug!(%var, %body, domain = ?domain.len(), "Lambda domain from reversed body");
            self.materialize(var, body, domain.values()?, &hint.first_as_unary(), false)
        };

        attempt().map_err(|err| match failure {
            Some(first) => Error::either("Cannot materialize lambda", first, err),
            None => err,
        })
    }

    /// Evaluate `body` once per value of `var`. Pairs are
    /// `(result, value)`, or `(value, result)` when `reversed`.
    fn materialize(
        &self,
        var: &str,
        body: &Formula,
        values: &[Value],
        hint: &UnaryHint,
        reversed: bool,
    ) -> Result<BinaryDenotation> {
        let mut pairs = Vec::new();
        for v in values {
            let results = self.compute_unary(body, &hint.with_var(var, v.clone()))?;
            for r in results.values()? {
                pairs.push(if reversed { (v.clone(), r.clone()) } else { (r.clone(), v.clone()) });
            }
        }
        Ok(BinaryDenotation::Explicit(pairs))
    }
}
