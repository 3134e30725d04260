//! The pattern tree and the query engine shared by every node.
//!
//! Every node answers three questions against a name:
//! - `match_range`: every way it can consume a prefix of `name[range]`, longest first
//! - `list`: every name it can produce on its own
//! - `complete`: what could be inserted at `start` to continue `name[start..position]`

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::error::PatternResult;
use crate::query::QueryContext;
use crate::resolver::PatternSymbolsResolver;
use crate::results::{CompletionItem, CompletionResults, ListResult, MatchResult};
use crate::scope::ScopeStack;

mod complex;
mod leaf;
mod reference;
mod regex;
mod sequence;

pub use complex::{ComplexPattern, ComplexPatternOptions, OptionsProvider, PatternsProvider};
pub use leaf::{AutoPopupPattern, StaticPattern, SymbolPlaceholderPattern};
pub use reference::SingleReferencePattern;
pub use regex::RegexPattern;
pub use sequence::SequencePattern;

/// Caps the number of static prefixes a node computes; past it, pruning is simply skipped.
const MAX_STATIC_PREFIXES: usize = 64;

/// What a node sees from its ancestors: the scope stack and the nearest resolver.
#[derive(Clone, Default)]
pub(crate) struct Frame {
    pub scope: ScopeStack,
    pub resolver: Option<Arc<dyn PatternSymbolsResolver>>,
}

impl Frame {
    pub fn root(scope: &ScopeStack) -> Self {
        Self {
            scope: scope.clone(),
            resolver: None,
        }
    }
}

pub(crate) trait PatternNode {
    fn match_range(
        &self,
        ctx: &QueryContext,
        frame: &Frame,
        name: &str,
        range: Range<usize>,
    ) -> PatternResult<Vec<MatchResult>>;

    fn list(&self, ctx: &QueryContext, frame: &Frame) -> PatternResult<Vec<ListResult>>;

    fn complete(
        &self,
        ctx: &QueryContext,
        frame: &Frame,
        name: &str,
        start: usize,
        position: usize,
    ) -> PatternResult<Vec<CompletionItem>>;

    /// Literal strings any match must start with. An empty string means "anything".
    fn static_prefixes(&self) -> Vec<String>;

    /// Whether this node always consumes exactly its static prefix
    fn is_static_and_required(&self) -> bool;
}

/// An immutable node of a name pattern tree. Cloning is cheap.
#[derive(Clone, Debug)]
pub enum Pattern {
    Static(Arc<StaticPattern>),
    Regex(Arc<RegexPattern>),
    SymbolPlaceholder(Arc<SymbolPlaceholderPattern>),
    AutoPopup(AutoPopupPattern),
    SingleReference(Arc<SingleReferencePattern>),
    Sequence(Arc<SequencePattern>),
    Complex(Arc<ComplexPattern>),
}

impl Pattern {
    fn node(&self) -> &dyn PatternNode {
        match self {
            Pattern::Static(p) => p.as_ref(),
            Pattern::Regex(p) => p.as_ref(),
            Pattern::SymbolPlaceholder(p) => p.as_ref(),
            Pattern::AutoPopup(p) => p,
            Pattern::SingleReference(p) => p.as_ref(),
            Pattern::Sequence(p) => p.as_ref(),
            Pattern::Complex(p) => p.as_ref(),
        }
    }

    /// Every way this pattern matches the whole of `name`
    pub fn match_name(
        &self,
        ctx: &QueryContext,
        scope: &ScopeStack,
        name: &str,
    ) -> PatternResult<Vec<MatchResult>> {
        let results = self.match_range(ctx, scope, name, 0..name.len())?;
        Ok(results
            .into_iter()
            .filter(|r| r.range.end == name.len())
            .collect())
    }

    /// Every way this pattern matches a prefix of `name[range]`, longest first.
    /// Returns nothing if the range is out of bounds or not on char boundaries.
    pub fn match_range(
        &self,
        ctx: &QueryContext,
        scope: &ScopeStack,
        name: &str,
        range: Range<usize>,
    ) -> PatternResult<Vec<MatchResult>> {
        if range.start > range.end || name.get(range.clone()).is_none() {
            return Ok(Vec::new());
        }
        self.node()
            .match_range(ctx, &Frame::root(scope), name, range)
    }

    /// Every name this pattern can produce
    pub fn list(&self, ctx: &QueryContext, scope: &ScopeStack) -> PatternResult<Vec<ListResult>> {
        self.node().list(ctx, &Frame::root(scope))
    }

    /// Completion candidates for `name` with the caret at `position`.
    /// Every item satisfies `offset <= position <= name.len()`.
    pub fn complete(
        &self,
        ctx: &QueryContext,
        scope: &ScopeStack,
        name: &str,
        position: usize,
    ) -> PatternResult<CompletionResults> {
        let position = position.min(name.len());
        if !name.is_char_boundary(position) {
            return Ok(CompletionResults::default());
        }
        let items = self
            .node()
            .complete(ctx, &Frame::root(scope), name, 0, position)?;
        Ok(CompletionResults::merge(
            items
                .into_iter()
                .filter(|item| item.offset <= position)
                .collect(),
        ))
    }

    pub fn static_prefixes(&self) -> Vec<String> {
        self.node().static_prefixes()
    }

    pub fn is_static_and_required(&self) -> bool {
        self.node().is_static_and_required()
    }

    pub(crate) fn match_in(
        &self,
        ctx: &QueryContext,
        frame: &Frame,
        name: &str,
        range: Range<usize>,
    ) -> PatternResult<Vec<MatchResult>> {
        self.node().match_range(ctx, frame, name, range)
    }

    pub(crate) fn list_in(
        &self,
        ctx: &QueryContext,
        frame: &Frame,
    ) -> PatternResult<Vec<ListResult>> {
        self.node().list(ctx, frame)
    }

    pub(crate) fn complete_in(
        &self,
        ctx: &QueryContext,
        frame: &Frame,
        name: &str,
        start: usize,
        position: usize,
    ) -> PatternResult<Vec<CompletionItem>> {
        self.node().complete(ctx, frame, name, start, position)
    }

    /// Whether a match could start at `text`, judging by static prefixes only
    pub(crate) fn may_match(&self, text: &str) -> bool {
        self.static_prefixes()
            .iter()
            .any(|prefix| text.starts_with(prefix.as_str()))
    }

    /// Whether completing `typed` could involve this pattern, judging by static prefixes only
    pub(crate) fn may_complete(&self, typed: &str) -> bool {
        self.static_prefixes()
            .iter()
            .any(|prefix| prefix.starts_with(typed) || typed.starts_with(prefix.as_str()))
    }
}

/// Renders the structure of the pattern, eg `data-{attribute-name}` or `(a|b)*`
impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Static(p) => write!(f, "{}", p.text()),
            Pattern::Regex(p) => {
                write!(f, "/{}/", p.pattern())?;
                if !p.is_case_sensitive() {
                    write!(f, "i")?;
                }
                Ok(())
            }
            Pattern::SymbolPlaceholder(p) => {
                write!(f, "{{{}}}", p.display_name().unwrap_or("symbol"))
            }
            Pattern::AutoPopup(_) => Ok(()),
            Pattern::SingleReference(p) => write!(f, "<{}>", p.target()),
            Pattern::Sequence(p) => p.children().iter().try_for_each(|c| write!(f, "{c}")),
            Pattern::Complex(p) => p.fmt_preview(f),
        }
    }
}

/// Concatenates every prefix of `left` with every prefix of `right`, bounded by
/// `MAX_STATIC_PREFIXES`. Returns `None` when the bound is exceeded.
pub(crate) fn combine_prefixes(left: &[String], right: &[String]) -> Option<Vec<String>> {
    if left.len().saturating_mul(right.len()) > MAX_STATIC_PREFIXES {
        return None;
    }
    let mut out = Vec::with_capacity(left.len() * right.len());
    for l in left {
        for r in right {
            let joined = format!("{l}{r}");
            if !out.contains(&joined) {
                out.push(joined);
            }
        }
    }
    Some(out)
}

/// The typed text between `start` and `position`, or `None` when the offsets are unusable
pub(crate) fn typed_text(name: &str, start: usize, position: usize) -> Option<&str> {
    if start > position {
        return None;
    }
    name.get(start..position)
}

/// End offsets of every char boundary in `name[range]` after `range.start`, longest first
pub(crate) fn candidate_ends(name: &str, range: Range<usize>) -> Vec<usize> {
    let Some(text) = name.get(range.clone()) else {
        return Vec::new();
    };
    let mut ends: Vec<usize> = text
        .char_indices()
        .skip(1)
        .map(|(i, _)| range.start + i)
        .collect();
    if !text.is_empty() {
        ends.push(range.end);
    }
    ends.reverse();
    ends
}
