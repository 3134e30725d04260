//! Persistent scope stack threaded through every query.
//!
//! Pushing never mutates: it returns a new stack sharing its tail with the old one, so a
//! `ComplexPattern` can extend the stack for its own children without siblings seeing it.

use std::fmt;
use std::sync::Arc;

use rpds::ListSync;

use crate::symbols::{QualifiedKind, SymbolRef};

/// External context consulted by a symbol registry during resolution.
pub trait Scope: fmt::Debug + Send + Sync {
    /// Symbols of the given kind this scope makes visible
    fn symbols(&self, kind: &QualifiedKind) -> Vec<SymbolRef>;
}

pub type ScopeRef = Arc<dyn Scope>;

/// Innermost scope first.
#[derive(Clone, Default)]
pub struct ScopeStack {
    scopes: ListSync<ScopeRef>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            scopes: ListSync::new_sync(),
        }
    }

    /// Returns a new stack with `scope` on top, sharing the rest of `self`
    #[must_use]
    pub fn push(&self, scope: ScopeRef) -> Self {
        Self {
            scopes: self.scopes.push_front(scope),
        }
    }

    pub fn top(&self) -> Option<&ScopeRef> {
        self.scopes.first()
    }

    /// Iterates from the innermost to the outermost scope
    pub fn iter(&self) -> impl Iterator<Item = &ScopeRef> {
        self.scopes.iter()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Symbols of `kind` contributed by every scope, innermost first
    pub fn symbols(&self, kind: &QualifiedKind) -> Vec<SymbolRef> {
        self.iter().flat_map(|scope| scope.symbols(kind)).collect()
    }
}

impl FromIterator<ScopeRef> for ScopeStack {
    /// The last scope of the iterator ends up on top
    fn from_iter<I: IntoIterator<Item = ScopeRef>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ScopeStack::new(), |stack, scope| stack.push(scope))
    }
}

impl fmt::Debug for ScopeStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.scopes.iter()).finish()
    }
}
