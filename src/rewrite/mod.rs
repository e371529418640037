//! # Formula rewriting
//!
//! Pure AST transformations applied before or during evaluation:
//!
//! - [`beta_reduce`]: `((lambda x body) arg)` becomes `body[x := arg]`
//! - [`substitute`]: capture-avoiding variable substitution
//! - [`reverse_formula`] / [`reverse_lambda`]: flip the ends of a binary
//!   syntactically, so a lambda can be materialized from the other side

use crate::denotation::Comparator;
use crate::formula::Formula;
use crate::storage::reverse_relation;

/// Apply every `((lambda x body) arg)` redex, innermost first.
pub fn beta_reduce(formula: &Formula) -> Formula {
    match formula {
        Formula::Join { relation, child } => {
            let relation = beta_reduce(relation);
            let child = beta_reduce(child);
            match relation {
                Formula::Lambda { var, body } => beta_reduce(&substitute(&body, &var, &child)),
                relation => Formula::join(relation, child),
            }
        }
        other => map_children(other, beta_reduce),
    }
}

/// Replace free occurrences of `var` in `formula` with `replacement`.
///
/// A `lambda` or `mark` rebinding `var` shadows it; its body is left alone.
/// A binder that would capture a free variable of `replacement` is renamed
/// first.
pub fn substitute(formula: &Formula, var: &str, replacement: &Formula) -> Formula {
    match formula {
        Formula::Variable(name) if name == var => replacement.clone(),
        Formula::Lambda { var: bound, .. } | Formula::Mark { var: bound, .. } if bound == var => formula.clone(),
        Formula::Lambda { var: bound, body } | Formula::Mark { var: bound, body }
            if occurs_free(replacement, bound) && occurs_free(body, var) =>
        {
            let fresh = fresh_name(bound, &[body.as_ref(), replacement], var);
            let body = substitute(&substitute(body, bound, &Formula::var(fresh.as_str())), var, replacement);
            match formula {
                Formula::Lambda { .. } => Formula::lambda(fresh, body),
                _ => Formula::mark(fresh, body),
            }
        }
        other => map_children(other, |f| substitute(f, var, replacement)),
    }
}

/// True when `var` appears free in `formula`.
pub fn occurs_free(formula: &Formula, var: &str) -> bool {
    match formula {
        Formula::Variable(name) => name == var,
        Formula::Value(_) => false,
        Formula::Lambda { var: bound, body } | Formula::Mark { var: bound, body } => {
            bound != var && occurs_free(body, var)
        }
        Formula::Join { relation, child } => occurs_free(relation, var) || occurs_free(child, var),
        Formula::Reverse(inner) => occurs_free(inner, var),
        Formula::Merge { left, right, .. } | Formula::Arithmetic { left, right, .. } => {
            occurs_free(left, var) || occurs_free(right, var)
        }
        Formula::Aggregate { child, .. } => occurs_free(child, var),
        Formula::Superlative { rank, count, head, relation, .. } => {
            [rank, count, head, relation].iter().any(|f| occurs_free(f, var))
        }
        Formula::Filter { base, relation } => occurs_free(base, var) || occurs_free(relation, var),
    }
}

/// `base` followed by the first numeric suffix free in every formula of `avoid`.
fn fresh_name(base: &str, avoid: &[&Formula], also: &str) -> String {
    (1u32..)
        .map(|i| format!("{base}{i}"))
        .find(|name| name != also && avoid.iter().all(|f| !occurs_free(f, name)))
        .unwrap_or_else(|| base.to_string())
}

/// Rebuild `formula` with `f` applied to each direct sub-formula.
fn map_children<F>(formula: &Formula, mut f: F) -> Formula
where
    F: FnMut(&Formula) -> Formula,
{
    let mut b = |x: &Formula| Box::new(f(x));
    match formula {
        Formula::Value(_) | Formula::Variable(_) => formula.clone(),
        Formula::Join { relation, child } => Formula::Join { relation: b(relation), child: b(child) },
        Formula::Reverse(inner) => Formula::Reverse(b(inner)),
        Formula::Merge { mode, left, right } => Formula::Merge { mode: *mode, left: b(left), right: b(right) },
        Formula::Mark { var, body } => Formula::Mark { var: var.clone(), body: b(body) },
        Formula::Lambda { var, body } => Formula::Lambda { var: var.clone(), body: b(body) },
        Formula::Aggregate { mode, child } => Formula::Aggregate { mode: *mode, child: b(child) },
        Formula::Superlative { mode, rank, count, head, relation } => Formula::Superlative {
            mode: *mode,
            rank: b(rank),
            count: b(count),
            head: b(head),
            relation: b(relation),
        },
        Formula::Arithmetic { mode, left, right } => {
            Formula::Arithmetic { mode: *mode, left: b(left), right: b(right) }
        }
        Formula::Filter { base, relation } => Formula::Filter { base: b(base), relation: b(relation) },
    }
}

/// The binary with its ends swapped.
///
/// Relation names toggle their `!` prefix, comparators flip, `(reverse r)`
/// unwraps, and a lambda over a join chain is reversed link by link.
/// Anything else is wrapped in `(reverse ..)`.
pub fn reverse_formula(formula: &Formula) -> Formula {
    match formula {
        Formula::Value(v) => match v.as_name() {
            Some(id) if id == Formula::EVERYTHING => formula.clone(),
            Some(id) => match Comparator::from_symbol(id) {
                Some(c) => Formula::name(c.reverse().symbol()),
                None => Formula::name(reverse_relation(id)),
            },
            None => Formula::reverse(formula.clone()),
        },
        Formula::Reverse(inner) => (**inner).clone(),
        Formula::Lambda { var, body } => {
            reverse_lambda(var, body).unwrap_or_else(|| Formula::reverse(formula.clone()))
        }
        other => Formula::reverse(other.clone()),
    }
}

/// Reverse `(lambda var body)` when `body` is a join chain ending in `(var var)`:
/// `(lambda x (r1 (r2 (var x))))` becomes `(lambda x (!r2 (!r1 (var x))))`.
pub fn reverse_lambda(var: &str, body: &Formula) -> Option<Formula> {
    let mut links = Vec::new();
    let mut cursor = body;
    loop {
        match cursor {
            Formula::Join { relation, child } => {
                links.push(relation.as_ref());
                cursor = child;
            }
            Formula::Variable(name) if name == var => break,
            _ => return None,
        }
    }
    let reversed = links
        .into_iter()
        .fold(Formula::var(var), |acc, relation| Formula::join(reverse_formula(relation), acc));
    Some(Formula::lambda(var, reversed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::parse;
    use pretty_assertions::assert_eq;

    fn f(text: &str) -> Formula {
        parse(text).unwrap()
    }

    #[test]
    fn test_beta_reduce_simple() {
        let reduced = beta_reduce(&f("((lambda x (place_of_birth (var x))) honolulu)"));
        assert_eq!(reduced, f("(place_of_birth honolulu)"));
    }

    #[test]
    fn test_beta_reduce_nested() {
        let reduced = beta_reduce(&f("(count ((lambda x ((lambda y (r (var y))) (var x))) a))"));
        assert_eq!(reduced, f("(count (r a))"));
    }

    #[test]
    fn test_substitute_respects_shadowing() {
        let body = f("(and (var x) (lambda x (r (var x))))");
        let out = substitute(&body, "x", &Formula::name("a"));
        assert_eq!(out, f("(and a (lambda x (r (var x))))"));
        let marked = substitute(&f("(mark x (r (var x)))"), "x", &Formula::name("a"));
        assert_eq!(marked, f("(mark x (r (var x)))"));
    }

    #[test]
    fn test_substitute_renames_capturing_binder() {
        let reduced = beta_reduce(&f("((lambda x (lambda y (r (and (var x) (var y))))) (var y))"));
        assert_eq!(reduced, f("(lambda y1 (r (and (var y) (var y1))))"));
        let marked = substitute(&f("(mark y (r (var x)))"), "x", &Formula::var("y"));
        assert_eq!(marked, f("(mark y1 (r (var y)))"));
        // no capture possible, binder kept
        let kept = substitute(&f("(lambda y (r (var x)))"), "x", &Formula::name("a"));
        assert_eq!(kept, f("(lambda y (r a))"));
    }

    #[test]
    fn test_occurs_free() {
        assert!(occurs_free(&f("(r (var x))"), "x"));
        assert!(!occurs_free(&f("(lambda x (r (var x)))"), "x"));
        assert!(occurs_free(&f("(argmax 1 1 * (reverse (lambda y (r (var x)))))"), "x"));
    }

    #[test]
    fn test_beta_reduce_leaves_floating_lambda() {
        let floating = f("(lambda x (place_of_birth (var x)))");
        assert_eq!(beta_reduce(&floating), floating);
    }

    #[test]
    fn test_reverse_chain() {
        let reversed = reverse_lambda("x", &f("(r1 (r2 (var x)))")).unwrap();
        assert_eq!(reversed, f("(lambda x (!r2 (!r1 (var x))))"));
        let inner = reverse_lambda("x", &f("((reverse r) (var x))")).unwrap();
        assert_eq!(inner, f("(lambda x (r (var x)))"));
    }

    #[test]
    fn test_reverse_non_chain_is_none() {
        assert!(reverse_lambda("x", &f("(count (r (var x)))")).is_none());
        assert!(reverse_lambda("x", &f("(r (var y))")).is_none());
    }

    #[test]
    fn test_reverse_formula() {
        assert_eq!(reverse_formula(&f("!place_of_birth")), f("place_of_birth"));
        assert_eq!(reverse_formula(&f(">")), f("<="));
        assert_eq!(reverse_formula(&f("(reverse r)")), f("r"));
        assert_eq!(reverse_formula(&f("(lambda x (count (var x)))")), f("(reverse (lambda x (count (var x))))"));
    }
}
