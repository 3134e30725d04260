use std::collections::HashSet;
use std::ops::Range;
use std::sync::OnceLock;

use crate::error::PatternResult;
use crate::patterns::{Frame, Pattern, PatternNode, combine_prefixes};
use crate::query::QueryContext;
use crate::results::{CompletionItem, ListResult, MatchResult};

/// Children matched one after the other.
///
/// Children are evaluated left to right. Each child reports every length it can consume at
/// the current offset and the sequence keeps, per reachable end offset, the first partial
/// match that got there in declaration order. Complete matches come out longest first.
#[derive(Debug)]
pub struct SequencePattern {
    children: Vec<Pattern>,
    prefixes: OnceLock<Vec<String>>,
}

impl SequencePattern {
    pub fn new(children: Vec<Pattern>) -> Self {
        Self {
            children,
            prefixes: OnceLock::new(),
        }
    }

    pub fn children(&self) -> &[Pattern] {
        &self.children
    }

    fn compute_prefixes(&self) -> Vec<String> {
        let mut acc = vec![String::new()];
        for child in &self.children {
            match combine_prefixes(&acc, &child.static_prefixes()) {
                Some(combined) => acc = combined,
                None => break,
            }
            if !child.is_static_and_required() {
                break;
            }
        }
        acc
    }

    /// The auto popup marker directly following child `index`, if any
    fn popup_after(&self, index: usize) -> Option<bool> {
        match self.children.get(index + 1) {
            Some(Pattern::AutoPopup(popup)) => Some(popup.is_sticky()),
            _ => None,
        }
    }
}

impl PatternNode for SequencePattern {
    fn match_range(
        &self,
        ctx: &QueryContext,
        frame: &Frame,
        name: &str,
        range: Range<usize>,
    ) -> PatternResult<Vec<MatchResult>> {
        let mut frontier = vec![MatchResult::empty_at(range.start)];

        for child in &self.children {
            ctx.check_cancelled()?;
            let mut next = Vec::new();
            let mut seen_ends = HashSet::new();
            for partial in &frontier {
                let remaining = partial.range.end..range.end;
                for result in child.match_in(ctx, frame, name, remaining)? {
                    if seen_ends.insert(result.range.end) {
                        next.push(partial.concat(result));
                    }
                }
            }
            if next.is_empty() {
                return Ok(Vec::new());
            }
            frontier = next;
        }

        frontier.sort_by(|a, b| b.range.end.cmp(&a.range.end));
        Ok(frontier)
    }

    fn list(&self, ctx: &QueryContext, frame: &Frame) -> PatternResult<Vec<ListResult>> {
        let mut acc = vec![ListResult::default()];
        for child in &self.children {
            ctx.check_cancelled()?;
            let listed = child.list_in(ctx, frame)?;
            if listed.is_empty() {
                return Ok(Vec::new());
            }
            acc = acc
                .iter()
                .flat_map(|prefix| listed.iter().map(move |suffix| prefix.concat(suffix)))
                .collect();
        }
        Ok(acc)
    }

    fn complete(
        &self,
        ctx: &QueryContext,
        frame: &Frame,
        name: &str,
        start: usize,
        position: usize,
    ) -> PatternResult<Vec<CompletionItem>> {
        let mut items = Vec::new();
        // offsets where the current child may start, reached by matching the previous
        // children against the text typed so far
        let mut frontier = vec![start];

        for (index, child) in self.children.iter().enumerate() {
            ctx.check_cancelled()?;
            let popup = self.popup_after(index);
            let mut next = Vec::new();

            for &offset in &frontier {
                for mut item in child.complete_in(ctx, frame, name, offset, position)? {
                    if let Some(sticky) = popup {
                        item.complete_after_insert = true;
                        item.sticky = sticky;
                    }
                    items.push(item);
                }
                for result in child.match_in(ctx, frame, name, offset..position)? {
                    if !next.contains(&result.range.end) {
                        next.push(result.range.end);
                    }
                }
            }

            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        Ok(items)
    }

    fn static_prefixes(&self) -> Vec<String> {
        self.prefixes.get_or_init(|| self.compute_prefixes()).clone()
    }

    fn is_static_and_required(&self) -> bool {
        self.children.iter().all(Pattern::is_static_and_required)
    }
}
