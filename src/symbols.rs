//! Symbol model shared by patterns, resolvers and registries.
//!
//! The engine treats symbols as opaque: it only ever looks at a symbol's name, qualified kind,
//! priority, api status, modifiers and, for symbols produced by a pattern match, the nested
//! name segments.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, PatternResult};
use crate::patterns::Pattern;
use crate::results::Segment;

/// A namespace + kind tag scoping registry queries, eg `html/attributes`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedKind {
    pub namespace: String,
    pub kind: String,
}

impl QualifiedKind {
    pub fn new(namespace: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            kind: kind.into(),
        }
    }

    pub fn with_name(&self, name: impl Into<String>) -> QualifiedName {
        QualifiedName {
            kind: self.clone(),
            name: name.into(),
        }
    }

    pub(crate) fn validate(&self) -> PatternResult<()> {
        if self.namespace.is_empty() || self.kind.is_empty() {
            return Err(Error::InvalidPath(format!(
                "qualified kind '{self}' needs both a namespace and a kind"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for QualifiedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.kind)
    }
}

/// One step of a qualified path: a kind and a name within it, eg `html/elements/div`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedName {
    #[serde(flatten)]
    pub kind: QualifiedKind,
    pub name: String,
}

impl QualifiedName {
    pub fn new(
        namespace: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        QualifiedKind::new(namespace, kind).with_name(name)
    }

    pub(crate) fn validate(&self) -> PatternResult<()> {
        self.kind.validate()?;
        if self.name.is_empty() {
            return Err(Error::InvalidPath(format!(
                "qualified name of kind '{}' has an empty name",
                self.kind
            )));
        }
        Ok(())
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Checks a whole path at construction time.
pub(crate) fn validate_path(path: &[QualifiedName]) -> PatternResult<()> {
    if path.is_empty() {
        return Err(Error::InvalidPath("path is empty".to_string()));
    }
    path.iter().try_for_each(QualifiedName::validate)
}

/// Ranking of symbols and completion items. Higher sorts first in completion.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Lowest,
    Low,
    #[default]
    Normal,
    High,
    Highest,
}

/// Lifecycle status of a symbol, used for deprecation and experimental display
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "message")]
pub enum ApiStatus {
    #[default]
    Stable,
    Experimental(Option<String>),
    Deprecated(Option<String>),
    Obsolete(Option<String>),
}

impl ApiStatus {
    pub fn is_deprecated_or_obsolete(&self) -> bool {
        matches!(self, ApiStatus::Deprecated(_) | ApiStatus::Obsolete(_))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Abstract,
    Virtual,
    Required,
    Optional,
    Readonly,
    Static,
}

/// Anything a registry can hand back to the engine.
pub trait Symbol: fmt::Debug + Send + Sync {
    fn qualified_kind(&self) -> &QualifiedKind;

    fn name(&self) -> &str;

    fn priority(&self) -> Option<Priority> {
        None
    }

    fn api_status(&self) -> Option<&ApiStatus> {
        None
    }

    fn modifiers(&self) -> &[Modifier] {
        &[]
    }

    /// Nested symbols reachable when a query path goes through this symbol
    fn members(&self) -> &[SymbolRef] {
        &[]
    }

    /// Set when this symbol's name is itself a pattern, eg `v-on:{event}`
    fn pattern(&self) -> Option<&Pattern> {
        None
    }

    /// Set when this symbol was produced by matching a name against a pattern
    fn name_segments(&self) -> &[Segment] {
        &[]
    }
}

pub type SymbolRef = Arc<dyn Symbol>;

/// A symbol produced by matching a concrete name against a pattern-named symbol.
#[derive(Debug, Clone)]
pub struct MatchedSymbol {
    pub kind: QualifiedKind,
    pub name: String,
    pub segments: Vec<Segment>,
    pub priority: Option<Priority>,
    pub api_status: Option<ApiStatus>,
}

impl Symbol for MatchedSymbol {
    fn qualified_kind(&self) -> &QualifiedKind {
        &self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> Option<Priority> {
        self.priority
    }

    fn api_status(&self) -> Option<&ApiStatus> {
        self.api_status.as_ref()
    }

    fn name_segments(&self) -> &[Segment] {
        &self.segments
    }
}
