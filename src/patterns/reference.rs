use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;

use crate::error::PatternResult;
use crate::patterns::{Frame, PatternNode, typed_text};
use crate::query::QueryContext;
use crate::resolver::or_nothing;
use crate::results::{CompletionItem, ListResult, MatchResult, Segment};
use crate::symbols::{
    MatchedSymbol, Modifier, QualifiedName, SymbolRef, validate_path,
};

/// Always refers to the symbols found at one fixed path, eg `html/elements/div`.
///
/// Each symbol found matches its own name, or its name pattern when it has one.
#[derive(Debug, Clone)]
pub struct SingleReferencePattern {
    path: Vec<QualifiedName>,
}

impl SingleReferencePattern {
    pub fn new(path: Vec<QualifiedName>) -> PatternResult<Self> {
        validate_path(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &[QualifiedName] {
        &self.path
    }

    /// The last step of the path, the one actually referenced
    pub fn target(&self) -> &QualifiedName {
        // validated non-empty at construction
        &self.path[self.path.len() - 1]
    }

    fn resolve(&self, ctx: &QueryContext, frame: &Frame) -> PatternResult<Vec<SymbolRef>> {
        ctx.check_cancelled()?;
        or_nothing(
            ctx.executor()
                .name_match_query(ctx, &self.path, &[Modifier::Abstract], &frame.scope),
            "single_reference",
        )
    }
}

/// Wraps the outcome of matching a name against `symbol`'s pattern into a symbol of its own
fn matched(symbol: &SymbolRef, name: &str, segments: Vec<Segment>, offset: usize) -> SymbolRef {
    Arc::new(MatchedSymbol {
        kind: symbol.qualified_kind().clone(),
        name: name.to_string(),
        segments: segments
            .into_iter()
            .map(|s| Segment {
                range: s.range.start - offset..s.range.end - offset,
                ..s
            })
            .collect(),
        priority: symbol.priority(),
        api_status: symbol.api_status().cloned(),
    })
}

impl PatternNode for SingleReferencePattern {
    fn match_range(
        &self,
        ctx: &QueryContext,
        frame: &Frame,
        name: &str,
        range: Range<usize>,
    ) -> PatternResult<Vec<MatchResult>> {
        let mut out = Vec::new();
        let mut seen_ends = HashSet::new();

        for symbol in self.resolve(ctx, frame)? {
            if let Some(pattern) = symbol.pattern() {
                let nested = Frame::root(&frame.scope);
                for result in pattern.match_in(ctx, &nested, name, range.clone())? {
                    if !seen_ends.insert(result.range.end) {
                        continue;
                    }
                    let text = &name[result.range.clone()];
                    let wrapped = matched(&symbol, text, result.segments, result.range.start);
                    out.push(MatchResult::new(
                        vec![Segment::with_symbols(result.range.clone(), vec![wrapped])],
                        result.range,
                    ));
                }
            } else {
                let end = range.start + symbol.name().len();
                if end <= range.end
                    && name.get(range.start..end) == Some(symbol.name())
                    && seen_ends.insert(end)
                {
                    out.push(MatchResult::new(
                        vec![Segment::with_symbols(range.start..end, vec![symbol.clone()])],
                        range.start..end,
                    ));
                }
            }
        }

        out.sort_by(|a, b| b.range.end.cmp(&a.range.end));
        Ok(out)
    }

    fn list(&self, ctx: &QueryContext, frame: &Frame) -> PatternResult<Vec<ListResult>> {
        let mut out = Vec::new();
        for symbol in self.resolve(ctx, frame)? {
            if let Some(pattern) = symbol.pattern() {
                for listed in pattern.list_in(ctx, &Frame::root(&frame.scope))? {
                    let wrapped = matched(&symbol, &listed.name, listed.segments, 0);
                    out.push(ListResult {
                        segments: vec![Segment::with_symbols(0..listed.name.len(), vec![wrapped])],
                        name: listed.name,
                    });
                }
            } else {
                let name = symbol.name().to_string();
                out.push(ListResult {
                    segments: vec![Segment::with_symbols(0..name.len(), vec![symbol])],
                    name,
                });
            }
        }
        Ok(out)
    }

    fn complete(
        &self,
        ctx: &QueryContext,
        frame: &Frame,
        name: &str,
        start: usize,
        position: usize,
    ) -> PatternResult<Vec<CompletionItem>> {
        let Some(typed) = typed_text(name, start, position) else {
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        for symbol in self.resolve(ctx, frame)? {
            if let Some(pattern) = symbol.pattern() {
                out.extend(pattern.complete_in(
                    ctx,
                    &Frame::root(&frame.scope),
                    name,
                    start,
                    position,
                )?);
            } else if symbol.name().len() > typed.len() && symbol.name().starts_with(typed) {
                out.push(CompletionItem::for_symbol(symbol, start));
            }
        }
        Ok(out)
    }

    fn static_prefixes(&self) -> Vec<String> {
        vec![String::new()]
    }

    fn is_static_and_required(&self) -> bool {
        false
    }
}
