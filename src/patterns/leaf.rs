use std::ops::Range;

use crate::error::PatternResult;
use crate::patterns::{Frame, PatternNode, candidate_ends, typed_text};
use crate::query::QueryContext;
use crate::results::{CompletionItem, ListResult, MatchResult, Segment};

/// Matches exactly one literal
#[derive(Debug, Clone)]
pub struct StaticPattern {
    text: String,
    case_sensitive: bool,
}

impl StaticPattern {
    pub fn new(text: impl Into<String>, case_sensitive: bool) -> Self {
        Self {
            text: text.into(),
            case_sensitive,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn same(&self, a: &str, b: &str) -> bool {
        if self.case_sensitive {
            a == b
        } else {
            a.eq_ignore_ascii_case(b)
        }
    }

    /// Whether `typed` could still become this literal
    fn continues(&self, typed: &str) -> bool {
        typed.len() < self.text.len()
            && self
                .text
                .get(..typed.len())
                .is_some_and(|head| self.same(head, typed))
    }
}

impl PatternNode for StaticPattern {
    fn match_range(
        &self,
        _ctx: &QueryContext,
        _frame: &Frame,
        name: &str,
        range: Range<usize>,
    ) -> PatternResult<Vec<MatchResult>> {
        let end = range.start + self.text.len();
        if end > range.end {
            return Ok(Vec::new());
        }
        match name.get(range.start..end) {
            Some(candidate) if self.same(candidate, &self.text) => Ok(vec![MatchResult::new(
                vec![Segment::literal(range.start..end)],
                range.start..end,
            )]),
            _ => Ok(Vec::new()),
        }
    }

    fn list(&self, _ctx: &QueryContext, _frame: &Frame) -> PatternResult<Vec<ListResult>> {
        Ok(vec![ListResult::literal(&self.text)])
    }

    fn complete(
        &self,
        _ctx: &QueryContext,
        _frame: &Frame,
        name: &str,
        start: usize,
        position: usize,
    ) -> PatternResult<Vec<CompletionItem>> {
        match typed_text(name, start, position) {
            Some(typed) if self.continues(typed) => {
                Ok(vec![CompletionItem::new(self.text.clone(), start)])
            }
            _ => Ok(Vec::new()),
        }
    }

    fn static_prefixes(&self) -> Vec<String> {
        if self.case_sensitive {
            vec![self.text.clone()]
        } else {
            vec![String::new()]
        }
    }

    fn is_static_and_required(&self) -> bool {
        self.case_sensitive
    }
}

/// The slot a resolver from an enclosing `ComplexPattern` fills in.
///
/// Without a resolver it only exists for previews and matches as an empty string.
#[derive(Debug, Clone, Default)]
pub struct SymbolPlaceholderPattern {
    display_name: Option<String>,
}

impl SymbolPlaceholderPattern {
    pub fn new(display_name: Option<String>) -> Self {
        Self { display_name }
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    fn segment(&self, range: Range<usize>, symbols: Vec<crate::symbols::SymbolRef>) -> Segment {
        Segment {
            display_name: self.display_name.clone(),
            ..Segment::with_symbols(range, symbols)
        }
    }
}

impl PatternNode for SymbolPlaceholderPattern {
    fn match_range(
        &self,
        ctx: &QueryContext,
        frame: &Frame,
        name: &str,
        range: Range<usize>,
    ) -> PatternResult<Vec<MatchResult>> {
        let Some(resolver) = &frame.resolver else {
            return Ok(vec![MatchResult::empty_at(range.start)]);
        };

        let mut out = Vec::new();
        for end in candidate_ends(name, range.clone()) {
            ctx.check_cancelled()?;
            let symbols = resolver.match_name(ctx, &frame.scope, &name[range.start..end])?;
            if !symbols.is_empty() {
                out.push(MatchResult::new(
                    vec![self.segment(range.start..end, symbols)],
                    range.start..end,
                ));
            }
        }
        Ok(out)
    }

    fn list(&self, ctx: &QueryContext, frame: &Frame) -> PatternResult<Vec<ListResult>> {
        let Some(resolver) = &frame.resolver else {
            return Ok(vec![ListResult::default()]);
        };

        let symbols = resolver.list_symbols(ctx, &frame.scope, true)?;
        Ok(symbols
            .into_iter()
            .map(|symbol| {
                let name = symbol.name().to_string();
                ListResult {
                    segments: vec![self.segment(0..name.len(), vec![symbol])],
                    name,
                }
            })
            .collect())
    }

    fn complete(
        &self,
        ctx: &QueryContext,
        frame: &Frame,
        name: &str,
        start: usize,
        position: usize,
    ) -> PatternResult<Vec<CompletionItem>> {
        let (Some(resolver), Some(typed)) = (&frame.resolver, typed_text(name, start, position))
        else {
            return Ok(Vec::new());
        };

        let items = resolver.code_completion(ctx, &frame.scope, typed, typed.len())?;
        Ok(items
            .into_iter()
            .map(|mut item| {
                if item.display_name.is_none() {
                    item.display_name = self.display_name.clone();
                }
                item.shifted(start)
            })
            .collect())
    }

    fn static_prefixes(&self) -> Vec<String> {
        vec![String::new()]
    }

    fn is_static_and_required(&self) -> bool {
        false
    }
}

/// Zero-width marker asking for the completion popup to reopen once this point is reached
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct AutoPopupPattern {
    sticky: bool,
}

impl AutoPopupPattern {
    pub fn new(sticky: bool) -> Self {
        Self { sticky }
    }

    pub fn is_sticky(&self) -> bool {
        self.sticky
    }
}

impl PatternNode for AutoPopupPattern {
    fn match_range(
        &self,
        _ctx: &QueryContext,
        _frame: &Frame,
        _name: &str,
        range: Range<usize>,
    ) -> PatternResult<Vec<MatchResult>> {
        Ok(vec![MatchResult::empty_at(range.start)])
    }

    fn list(&self, _ctx: &QueryContext, _frame: &Frame) -> PatternResult<Vec<ListResult>> {
        Ok(vec![ListResult::default()])
    }

    fn complete(
        &self,
        _ctx: &QueryContext,
        _frame: &Frame,
        _name: &str,
        _start: usize,
        _position: usize,
    ) -> PatternResult<Vec<CompletionItem>> {
        Ok(Vec::new())
    }

    fn static_prefixes(&self) -> Vec<String> {
        vec![String::new()]
    }

    fn is_static_and_required(&self) -> bool {
        true
    }
}
