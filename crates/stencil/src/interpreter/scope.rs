//! Variable scopes and the vars binder.

use std::collections::BTreeMap;

use crate::interpreter::error::{RenderError, compute_suggestions};
use crate::parser::Template;
use crate::parser::error::position;
use crate::types::{Marked, Value};

/// A mapping from variable names to values for one evaluation.
///
/// Scopes are built either directly (the closure scope a bare-reference
/// template argument resolves in) or by [`Scope::bind`], which validates
/// a vars value first.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    vars: BTreeMap<String, Marked>,
}

impl Scope {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a name. Replaces any previous binding of the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Marked>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Look up a name.
    pub fn get(&self, name: &str) -> Option<&Marked> {
        self.vars.get(name)
    }

    /// Whether a name is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// All bound names, in sorted order, for suggestion computation.
    pub fn names(&self) -> Vec<String> {
        self.vars.keys().cloned().collect()
    }

    /// Validate a vars value and bind it into a scope.
    ///
    /// The value must be a map or an object, and every key must be a
    /// valid identifier; the first violating key aborts the binding.
    /// Marks on the vars value as a whole flow onto every variable, so
    /// they reach the output of any template that uses one.
    pub fn bind(vars: &Marked) -> Result<Scope, RenderError> {
        let entries = match &vars.value {
            Value::Map(entries) | Value::Object(entries) => entries,
            other => return Err(RenderError::VarsType { got: other.kind() }),
        };
        let mut scope = Scope::new();
        for (name, value) in entries {
            if !is_identifier(name) {
                return Err(RenderError::VarName { name: name.clone() });
            }
            let mut bound = value.clone();
            bound.absorb(&vars.marks);
            scope.vars.insert(name.clone(), bound);
        }
        Ok(scope)
    }

    /// Check that every root identifier the template references is bound
    /// here, reporting the first miss with its location in `source`.
    pub fn check_references(&self, template: &Template, source: &str) -> Result<(), RenderError> {
        for (name, span) in template.root_references() {
            if !self.contains(&name) {
                let (line, column) = position(source, span.start);
                let names = self.names();
                let suggestions = compute_suggestions(&name, &names);
                return Err(RenderError::UnboundVariable { name, line, column, suggestions });
            }
        }
        Ok(())
    }
}

/// Whether `s` satisfies the identifier grammar: a letter, then letters,
/// digits, and underscores.
///
/// This intentionally describes idiomatic variable names rather than
/// every name the template grammar could technically traverse to.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}
