use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, PatternResult};
use crate::results::CompletionItem;
use crate::scope::ScopeStack;
use crate::symbols::{Modifier, QualifiedKind, QualifiedName, SymbolRef};

/// The symbol registry patterns query against.
///
/// Implementations may be arbitrarily slow; the engine checks its cancellation token before
/// every call. `ctx` is the query being answered, so patterns evaluated on behalf of it
/// (names of pattern-named symbols) share its cancellation and limits. Returning an error
/// other than [`Error::Cancelled`] is treated as "no symbols" for the leaf that asked.
pub trait SymbolQueryExecutor: Send + Sync {
    /// Symbols matching the last element of `path`, reached through the previous elements
    fn name_match_query(
        &self,
        ctx: &QueryContext<'_>,
        path: &[QualifiedName],
        exclude_modifiers: &[Modifier],
        additional_scope: &ScopeStack,
    ) -> PatternResult<Vec<SymbolRef>>;

    /// Every symbol of `kind` reachable through `path`
    fn list_symbols_query(
        &self,
        ctx: &QueryContext<'_>,
        path: &[QualifiedName],
        kind: &QualifiedKind,
        expand_patterns: bool,
        exclude_modifiers: &[Modifier],
        additional_scope: &ScopeStack,
    ) -> PatternResult<Vec<SymbolRef>>;

    /// Completions for the partially typed name of the last element of `path`.
    /// Item offsets are relative to the start of that name.
    fn code_completion_query(
        &self,
        ctx: &QueryContext<'_>,
        path: &[QualifiedName],
        position: usize,
        exclude_modifiers: &[Modifier],
        additional_scope: &ScopeStack,
    ) -> PatternResult<Vec<CompletionItem>>;

    /// A view of this executor applying `rules` on top of its own
    fn with_name_conversion_rules(
        &self,
        rules: &[NameConversionRule],
    ) -> Arc<dyn SymbolQueryExecutor>;
}

/// How names of one kind are normalised before being compared
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NameConverter {
    Lowercase,
    KebabCase,
    SnakeCase,
}

impl NameConverter {
    pub fn convert(self, name: &str) -> String {
        match self {
            NameConverter::Lowercase => name.to_lowercase(),
            NameConverter::KebabCase => split_words(name, '-'),
            NameConverter::SnakeCase => split_words(name, '_'),
        }
    }
}

/// `fooBar`, `foo_bar` and `foo-bar` all become `foo{sep}bar`
fn split_words(name: &str, sep: char) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c == '-' || c == '_' {
            out.push(sep);
        } else if c.is_uppercase() {
            if i > 0 && !out.ends_with(sep) {
                out.push(sep);
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameConversionRule {
    #[serde(flatten)]
    pub kind: QualifiedKind,
    pub converter: NameConverter,
}

impl NameConversionRule {
    pub fn new(kind: QualifiedKind, converter: NameConverter) -> Self {
        Self { kind, converter }
    }
}

/// Default cap on how many times a repeating pattern is unrolled when listing
pub const DEFAULT_LIST_REPEAT_LIMIT: usize = 4;

/// Everything a query needs besides the pattern and the input.
///
/// ```ignore
/// let ctx = QueryContext::new(&registry)
///     .with_owner(element)
///     .with_cancellation(token.clone());
/// ```
#[derive(Clone)]
pub struct QueryContext<'a> {
    executor: &'a dyn SymbolQueryExecutor,
    owner: Option<SymbolRef>,
    cancellation: CancellationToken,
    list_repeat_limit: usize,
}

impl<'a> QueryContext<'a> {
    pub fn new(executor: &'a dyn SymbolQueryExecutor) -> Self {
        Self {
            executor,
            owner: None,
            cancellation: CancellationToken::new(),
            list_repeat_limit: DEFAULT_LIST_REPEAT_LIMIT,
        }
    }

    /// The symbol whose name is being matched, for patterns that depend on it
    pub fn with_owner(mut self, owner: SymbolRef) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// How many iterations of a repeating pattern `list` unrolls at most. Always at least 1.
    pub fn with_list_repeat_limit(mut self, limit: usize) -> Self {
        self.list_repeat_limit = limit.max(1);
        self
    }

    /// Same query, answered by `executor`
    pub fn for_executor<'b>(&self, executor: &'b dyn SymbolQueryExecutor) -> QueryContext<'b> {
        QueryContext {
            executor,
            owner: self.owner.clone(),
            cancellation: self.cancellation.clone(),
            list_repeat_limit: self.list_repeat_limit,
        }
    }

    pub fn executor(&self) -> &'a dyn SymbolQueryExecutor {
        self.executor
    }

    pub fn owner(&self) -> Option<&SymbolRef> {
        self.owner.as_ref()
    }

    pub fn list_repeat_limit(&self) -> usize {
        self.list_repeat_limit
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub(crate) fn check_cancelled(&self) -> PatternResult<()> {
        if self.cancellation.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for QueryContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryContext")
            .field("owner", &self.owner)
            .field("cancelled", &self.is_cancelled())
            .field("list_repeat_limit", &self.list_repeat_limit)
            .finish()
    }
}
