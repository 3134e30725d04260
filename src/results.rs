use std::collections::HashSet;
use std::fmt;
use std::ops::Range;

use crate::symbols::{ApiStatus, Priority, SymbolRef};

/// A sub-range of a name, optionally carrying the symbols it resolved to.
#[derive(Debug, Clone, Default)]
pub struct Segment {
    /// Byte span within the matched or listed name
    pub range: Range<usize>,
    /// Empty for literal spans
    pub symbols: Vec<SymbolRef>,
    pub display_name: Option<String>,
    pub api_status: Option<ApiStatus>,
    pub priority: Option<Priority>,
}

impl Segment {
    pub fn literal(range: Range<usize>) -> Self {
        Self {
            range,
            ..Default::default()
        }
    }

    pub fn with_symbols(range: Range<usize>, symbols: Vec<SymbolRef>) -> Self {
        Self {
            range,
            symbols,
            ..Default::default()
        }
    }

    pub fn is_literal(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty() && self.symbols.is_empty()
    }

    pub(crate) fn shifted(mut self, offset: usize) -> Self {
        self.range = self.range.start + offset..self.range.end + offset;
        self
    }

    pub fn symbol_names(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(|s| s.name())
    }
}

/// One way a pattern accepted `range` of the input.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub segments: Vec<Segment>,
    pub range: Range<usize>,
}

impl MatchResult {
    pub(crate) fn new(segments: Vec<Segment>, range: Range<usize>) -> Self {
        let mut result = Self { segments, range };
        result.prune();
        result
    }

    pub(crate) fn empty_at(offset: usize) -> Self {
        Self {
            segments: Vec::new(),
            range: offset..offset,
        }
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Appends `other`, which must start where `self` ends
    pub(crate) fn concat(&self, other: MatchResult) -> MatchResult {
        debug_assert_eq!(self.range.end, other.range.start);
        let mut segments = self.segments.clone();
        segments.extend(other.segments);
        MatchResult::new(segments, self.range.start..other.range.end)
    }

    pub(crate) fn prune(&mut self) {
        self.segments.retain(|s| !s.is_empty());
    }

    /// Names of every symbol resolved anywhere in this result
    pub fn symbol_names(&self) -> HashSet<&str> {
        self.segments.iter().flat_map(Segment::symbol_names).collect()
    }

    /// Renders the segments as `[a][b:sym]` against the input, mostly for tests and tooling
    pub fn describe(&self, input: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            let text = input.get(segment.range.clone()).unwrap_or_default();
            if segment.is_literal() {
                out.push_str(&format!("[{text}]"));
            } else {
                let names: Vec<_> = segment.symbol_names().collect();
                out.push_str(&format!("[{text}:{}]", names.join("|")));
            }
        }
        out
    }
}

/// One enumerated legal name and how it is built.
#[derive(Debug, Clone, Default)]
pub struct ListResult {
    pub name: String,
    /// Ranges index into `name`
    pub segments: Vec<Segment>,
}

impl ListResult {
    pub(crate) fn literal(text: &str) -> Self {
        Self {
            name: text.to_string(),
            segments: vec![Segment::literal(0..text.len())],
        }
    }

    pub(crate) fn concat(&self, other: &ListResult) -> ListResult {
        let offset = self.name.len();
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned().map(|s| s.shifted(offset)));
        segments.retain(|s| !s.is_empty());
        ListResult {
            name: format!("{}{}", self.name, other.name),
            segments,
        }
    }

    pub fn symbol_names(&self) -> HashSet<&str> {
        self.segments.iter().flat_map(Segment::symbol_names).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompletionItem {
    /// Text to insert in place of `name[offset..position]`
    pub name: String,
    /// Byte offset in the name given to `complete`
    pub offset: usize,
    pub priority: Option<Priority>,
    pub complete_after_insert: bool,
    /// Reopen the popup after every keystroke rather than once
    pub sticky: bool,
    pub display_name: Option<String>,
    pub api_status: Option<ApiStatus>,
    pub symbol: Option<SymbolRef>,
}

impl CompletionItem {
    pub fn new(name: impl Into<String>, offset: usize) -> Self {
        Self {
            name: name.into(),
            offset,
            ..Default::default()
        }
    }

    pub fn for_symbol(symbol: SymbolRef, offset: usize) -> Self {
        Self {
            name: symbol.name().to_string(),
            offset,
            priority: symbol.priority(),
            api_status: symbol.api_status().cloned(),
            symbol: Some(symbol),
            ..Default::default()
        }
    }

    pub(crate) fn shifted(mut self, offset: usize) -> Self {
        self.offset += offset;
        self
    }

    fn dedup_key(&self) -> (usize, String, bool) {
        (self.offset, self.name.clone(), self.complete_after_insert)
    }
}

impl fmt::Display for CompletionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.offset)?;
        if self.complete_after_insert {
            write!(f, "+")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompletionResults {
    pub items: Vec<CompletionItem>,
}

impl CompletionResults {
    /// Deduplicates by `(offset, name, complete_after_insert)` keeping the first occurrence,
    /// then orders by priority, highest first. The sort is stable so declaration order
    /// breaks ties.
    pub(crate) fn merge(items: Vec<CompletionItem>) -> Self {
        let mut seen = HashSet::new();
        let mut items: Vec<_> = items
            .into_iter()
            .filter(|item| seen.insert(item.dedup_key()))
            .collect();
        items.sort_by(|a, b| {
            b.priority
                .unwrap_or_default()
                .cmp(&a.priority.unwrap_or_default())
        });
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.name.as_str()).collect()
    }
}
