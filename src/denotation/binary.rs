//! Binary denotations: relations between two values.
//!
//! A binary `r` holds pairs `(first, second)`. Joining `(r child)` keeps the
//! firsts whose second lies in `child`.

use std::fmt;

use hashbrown::HashSet;
use smallvec::{smallvec, SmallVec};

use super::{Comparator, UnaryDenotation};
use crate::execution::ExecutorConfig;
use crate::formula::MergeMode;
use crate::model::{Answer, Value};
use crate::storage::{reverse_relation, KnowledgeGraph};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum BinaryDenotation {
    /// Concrete pairs, duplicates preserved.
    Explicit(Vec<(Value, Value)>),
    /// The union of one or more graph relations.
    Predicate(SmallVec<[String; 1]>),
    /// A comparator relation: `(x, y)` with `x <op> y`.
    Special(Comparator),
}

impl BinaryDenotation {
    pub fn predicate(relation: impl Into<String>) -> Self {
        BinaryDenotation::Predicate(smallvec![relation.into()])
    }

    /// Swap the ends of every pair.
    pub fn reverse(&self) -> BinaryDenotation {
        match self {
            BinaryDenotation::Explicit(pairs) => {
                BinaryDenotation::Explicit(pairs.iter().map(|(x, y)| (y.clone(), x.clone())).collect())
            }
            BinaryDenotation::Predicate(relations) => {
                BinaryDenotation::Predicate(relations.iter().map(|r| reverse_relation(r)).collect())
            }
            BinaryDenotation::Special(c) => BinaryDenotation::Special(c.reverse()),
        }
    }

    /// `{ x | (x, y) in self, y in seconds }`, the usual join `(r child)`.
    pub fn join_second<G>(&self, seconds: &UnaryDenotation, graph: &G, config: &ExecutorConfig) -> Result<UnaryDenotation>
    where
        G: KnowledgeGraph + ?Sized,
    {
        match self {
            BinaryDenotation::Explicit(pairs) => {
                let mut firsts = Vec::new();
                for (x, y) in pairs {
                    if seconds.contains(y)? {
                        firsts.push(x.clone());
                    }
                }
                Ok(UnaryDenotation::explicit(firsts))
            }
            BinaryDenotation::Predicate(relations) => {
                let mut firsts = Vec::new();
                for r in relations {
                    firsts.extend(graph.join_second(r, seconds)?);
                }
                Ok(UnaryDenotation::explicit(firsts))
            }
            BinaryDenotation::Special(c) => comparison_from(*c, seconds, config),
        }
    }

    /// `{ y | (x, y) in self, x in firsts }`.
    pub fn join_first<G>(&self, firsts: &UnaryDenotation, graph: &G, config: &ExecutorConfig) -> Result<UnaryDenotation>
    where
        G: KnowledgeGraph + ?Sized,
    {
        match self {
            BinaryDenotation::Explicit(pairs) => {
                let mut seconds = Vec::new();
                for (x, y) in pairs {
                    if firsts.contains(x)? {
                        seconds.push(y.clone());
                    }
                }
                Ok(UnaryDenotation::explicit(seconds))
            }
            BinaryDenotation::Predicate(relations) => {
                let mut seconds = Vec::new();
                for r in relations {
                    seconds.extend(graph.join_first(r, firsts)?);
                }
                Ok(UnaryDenotation::explicit(seconds))
            }
            BinaryDenotation::Special(c) => comparison_from(c.reverse(), firsts, config),
        }
    }

    /// Pairs whose second is in `seconds`.
    pub fn explicitly_filter_second<G>(&self, seconds: &UnaryDenotation, graph: &G) -> Result<Vec<(Value, Value)>>
    where
        G: KnowledgeGraph + ?Sized,
    {
        match self {
            BinaryDenotation::Explicit(pairs) => retain_pairs(pairs, |(_, y)| seconds.contains(y)),
            BinaryDenotation::Predicate(relations) => {
                let mut pairs = Vec::new();
                for r in relations {
                    pairs.extend(graph.filter_second(r, seconds)?);
                }
                Ok(pairs)
            }
            BinaryDenotation::Special(c) => Err(Error::InfiniteList(format!("Cannot enumerate the pairs of {c}"))),
        }
    }

    /// `and` / `or` of two binaries. Relations union by name; explicit pairs
    /// use set semantics. Anything else cannot be combined without a graph.
    pub fn merge(&self, other: &BinaryDenotation, mode: MergeMode) -> Result<BinaryDenotation> {
        match (self, other, mode) {
            (BinaryDenotation::Predicate(a), BinaryDenotation::Predicate(b), MergeMode::Or) => {
                let mut relations = a.clone();
                for r in b {
                    if !relations.contains(r) {
                        relations.push(r.clone());
                    }
                }
                Ok(BinaryDenotation::Predicate(relations))
            }
            (BinaryDenotation::Explicit(a), BinaryDenotation::Explicit(b), mode) => {
                let pairs = match mode {
                    MergeMode::And => {
                        let keep: HashSet<&(Value, Value)> = b.iter().collect();
                        dedup_pairs(a.iter().filter(|p| keep.contains(p)).cloned())
                    }
                    MergeMode::Or => dedup_pairs(a.iter().chain(b).cloned()),
                };
                Ok(BinaryDenotation::Explicit(pairs))
            }
            _ => Err(Error::NotBinary(format!("Cannot {} binaries {self} and {other}", mode.keyword()))),
        }
    }

    /// All pairs, deduplicated in first-occurrence order.
    pub fn to_pairs<G>(&self, graph: &G) -> Result<Vec<(Value, Value)>>
    where
        G: KnowledgeGraph + ?Sized,
    {
        let pairs = match self {
            BinaryDenotation::Explicit(pairs) => pairs.clone(),
            predicate => predicate.explicitly_filter_second(&UnaryDenotation::Everything, graph)?,
        };
        Ok(dedup_pairs(pairs))
    }

    /// Output conversion for a top-level binary.
    pub fn to_answer<G>(&self, graph: &G, config: &ExecutorConfig) -> Result<Answer>
    where
        G: KnowledgeGraph + ?Sized,
    {
        let mut pairs = self.to_pairs(graph)?;
        if config.sort_results {
            pairs.sort();
        }
        if pairs.is_empty() && config.fail_on_empty_lists {
            return Err(Error::EmptyList("The result is empty".into()));
        }
        Ok(Answer::PairList(pairs))
    }
}

/// The unary denoted by joining a comparator with `operand`.
fn comparison_from(c: Comparator, operand: &UnaryDenotation, config: &ExecutorConfig) -> Result<UnaryDenotation> {
    match operand {
        UnaryDenotation::Everything => Ok(UnaryDenotation::Everything),
        UnaryDenotation::GenericDate(date) => {
            // A partial date covers a span; compare against the matching end.
            let pivot = match c {
                Comparator::Lt | Comparator::Ge => date.earliest(),
                Comparator::Gt | Comparator::Le => date.latest(),
                Comparator::Ne => {
                    return Err(Error::TypeMismatch(format!("Cannot compare {operand} with !=")));
                }
            };
            UnaryDenotation::comparison(c, Value::Date(pivot), config)
        }
        _ => UnaryDenotation::comparison(c, operand.single_value()?.clone(), config),
    }
}

fn retain_pairs<F>(pairs: &[(Value, Value)], mut keep: F) -> Result<Vec<(Value, Value)>>
where
    F: FnMut(&(Value, Value)) -> Result<bool>,
{
    let mut kept = Vec::new();
    for pair in pairs {
        if keep(pair)? {
            kept.push(pair.clone());
        }
    }
    Ok(kept)
}

fn dedup_pairs(pairs: impl IntoIterator<Item = (Value, Value)>) -> Vec<(Value, Value)> {
    let mut seen = HashSet::new();
    pairs.into_iter().filter(|p| seen.insert(p.clone())).collect()
}

impl fmt::Display for BinaryDenotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryDenotation::Explicit(pairs) => {
                write!(f, "(binary")?;
                for (x, y) in pairs {
                    write!(f, " ({x} {y})")?;
                }
                write!(f, ")")
            }
            BinaryDenotation::Predicate(relations) => write!(f, "(binary {})", relations.join(" ")),
            BinaryDenotation::Special(c) => write!(f, "(binary {c})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DateValue;
    use crate::storage::TripleGraph;
    use pretty_assertions::assert_eq;

    fn graph() -> TripleGraph {
        TripleGraph::from_lisp(
            "(graph
               (obama place_of_birth honolulu)
               (kidman place_of_birth honolulu)
               (bush place_of_birth new_haven)
               (obama profession politician))",
        )
        .unwrap()
    }

    fn cfg() -> ExecutorConfig {
        ExecutorConfig::default()
    }

    fn name(id: &str) -> Value {
        Value::name(id)
    }

    #[test]
    fn test_predicate_join_second() {
        let pob = BinaryDenotation::predicate("place_of_birth");
        let people = pob.join_second(&UnaryDenotation::singleton(name("honolulu")), &graph(), &cfg()).unwrap();
        assert_eq!(people, UnaryDenotation::explicit([name("obama"), name("kidman")]));
    }

    #[test]
    fn test_predicate_reverse() {
        let pob = BinaryDenotation::predicate("place_of_birth").reverse();
        assert_eq!(pob, BinaryDenotation::predicate("!place_of_birth"));
        let places = pob.join_second(&UnaryDenotation::singleton(name("bush")), &graph(), &cfg()).unwrap();
        assert_eq!(places, UnaryDenotation::singleton(name("new_haven")));
    }

    #[test]
    fn test_explicit_join_both_ways() {
        let b = BinaryDenotation::Explicit(vec![(name("a"), name("x")), (name("b"), name("y"))]);
        let g = graph();
        assert_eq!(b.join_second(&UnaryDenotation::singleton(name("y")), &g, &cfg()).unwrap(), UnaryDenotation::singleton(name("b")));
        assert_eq!(b.join_first(&UnaryDenotation::singleton(name("a")), &g, &cfg()).unwrap(), UnaryDenotation::singleton(name("x")));
        assert_eq!(b.reverse().reverse(), b);
    }

    #[test]
    fn test_special_join_builds_comparison() {
        let gt = BinaryDenotation::Special(Comparator::Gt);
        let five = UnaryDenotation::singleton(Value::number(5.0));
        let d = gt.join_second(&five, &graph(), &cfg()).unwrap();
        assert!(d.contains(&Value::number(6.0)).unwrap());
        assert!(!d.contains(&Value::number(5.0)).unwrap());
        let everything = gt.join_second(&UnaryDenotation::Everything, &graph(), &cfg()).unwrap();
        assert!(everything.is_everything());
        let two = UnaryDenotation::explicit([Value::number(1.0), Value::number(2.0)]);
        assert!(matches!(gt.join_second(&two, &graph(), &cfg()), Err(Error::NonSingletonList(_))));
    }

    #[test]
    fn test_special_join_with_partial_date() {
        let year = UnaryDenotation::GenericDate(DateValue::new(2015, -1, -1));
        let after = BinaryDenotation::Special(Comparator::Gt).join_second(&year, &graph(), &cfg()).unwrap();
        assert!(after.contains(&Value::date(2016, 1, 1)).unwrap());
        assert!(!after.contains(&Value::date(2015, 12, 31)).unwrap());
        let before = BinaryDenotation::Special(Comparator::Lt).join_second(&year, &graph(), &cfg()).unwrap();
        assert!(before.contains(&Value::date(2014, 12, 31)).unwrap());
        assert!(!before.contains(&Value::date(2015, 1, 1)).unwrap());
        assert!(BinaryDenotation::Special(Comparator::Ne).join_second(&year, &graph(), &cfg()).is_err());
    }

    #[test]
    fn test_special_cannot_enumerate() {
        let ne = BinaryDenotation::Special(Comparator::Ne);
        assert!(matches!(
            ne.explicitly_filter_second(&UnaryDenotation::Everything, &graph()),
            Err(Error::InfiniteList(_))
        ));
        assert!(ne.to_answer(&graph(), &cfg()).is_err());
    }

    #[test]
    fn test_predicate_to_answer() {
        let answer = BinaryDenotation::predicate("profession").to_answer(&graph(), &cfg()).unwrap();
        assert_eq!(answer, Answer::PairList(vec![(name("obama"), name("politician"))]));
    }

    #[test]
    fn test_merge_predicates() {
        let a = BinaryDenotation::predicate("place_of_birth");
        let b = BinaryDenotation::predicate("profession");
        let union = a.merge(&b, MergeMode::Or).unwrap();
        let firsts = union.join_second(&UnaryDenotation::Everything, &graph(), &cfg()).unwrap();
        assert_eq!(firsts.len(), Some(4));
        assert!(matches!(a.merge(&b, MergeMode::And), Err(Error::NotBinary(_))));
    }
}
