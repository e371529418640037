//! Persistent variable environment.
//!
//! A singly linked association list with structural sharing: `plus`
//! prepends a binding in O(1) and never touches the parent map, so every
//! lambda body sees its own environment while siblings keep theirs.
//! Lookups are O(depth), which is small since lambdas rarely nest deeply.

use std::fmt;
use std::sync::Arc;

use crate::model::Value;
use crate::{Error, Result};

/// Immutable name → value environment.
#[derive(Clone, Default)]
pub struct VariableMap {
    head: Option<Arc<Binding>>,
}

struct Binding {
    name: String,
    slot: Slot,
    next: Option<Arc<Binding>>,
}

enum Slot {
    Bound(Value),
    /// Declared, but ranging over every value.
    Free,
}

/// Result of a successful lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Bound(&'a Value),
    Free,
}

impl VariableMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    fn push(&self, name: &str, slot: Slot) -> Self {
        Self {
            head: Some(Arc::new(Binding {
                name: name.to_string(),
                slot,
                next: self.head.clone(),
            })),
        }
    }

    /// Bind `name` to `value`, shadowing any outer binding.
    pub fn plus(&self, name: &str, value: Value) -> Self {
        self.push(name, Slot::Bound(value))
    }

    /// Declare `name` as free. At most one free variable may be visible.
    pub fn plus_free_var(&self, name: &str) -> Result<Self> {
        if let Some(existing) = self.free_var() {
            return Err(Error::InvalidFormula(format!(
                "Cannot declare free variable {name}: {existing} is already free"
            )));
        }
        Ok(self.push(name, Slot::Free))
    }

    /// Innermost binding of `name`. An unbound name is an invalid formula.
    pub fn get(&self, name: &str) -> Result<Lookup<'_>> {
        self.bindings()
            .find(|b| b.name == name)
            .map(|b| match &b.slot {
                Slot::Bound(v) => Lookup::Bound(v),
                Slot::Free => Lookup::Free,
            })
            .ok_or_else(|| Error::InvalidFormula(format!("Unbound variable: {name}")))
    }

    /// The visible free variable, if any.
    pub fn free_var(&self) -> Option<&str> {
        self.visible()
            .find(|b| matches!(b.slot, Slot::Free))
            .map(|b| b.name.as_str())
    }

    /// The binding when exactly one variable is visible and it is bound.
    pub fn single_bound(&self) -> Option<(&str, &Value)> {
        let mut visible = self.visible();
        let only = visible.next()?;
        if visible.next().is_some() {
            return None;
        }
        match &only.slot {
            Slot::Bound(v) => Some((only.name.as_str(), v)),
            Slot::Free => None,
        }
    }

    /// Number of visible (unshadowed) variables.
    pub fn len(&self) -> usize {
        self.visible().count()
    }

    fn bindings(&self) -> impl Iterator<Item = &Binding> {
        std::iter::successors(self.head.as_deref(), |b| b.next.as_deref())
    }

    /// Bindings not shadowed by an inner binding of the same name.
    fn visible(&self) -> impl Iterator<Item = &Binding> {
        let mut seen: Vec<&str> = Vec::new();
        self.bindings().filter(move |&b| {
            if seen.contains(&b.name.as_str()) {
                false
            } else {
                seen.push(&b.name);
                true
            }
        })
    }
}

impl fmt::Display for VariableMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, b) in self.visible().enumerate() {
            if i > 0 { write!(f, ", ")?; }
            match &b.slot {
                Slot::Bound(v) => write!(f, "{}={v}", b.name)?,
                Slot::Free => write!(f, "{}=?", b.name)?,
            }
        }
        write!(f, "}}")
    }
}

impl fmt::Debug for VariableMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VariableMap{self}")
    }
}
