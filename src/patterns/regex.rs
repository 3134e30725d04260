use std::fmt;
use std::ops::Range;

use onig::{RegexOptions, SearchOptions, Syntax};

use crate::error::{Error, PatternResult};
use crate::patterns::{Frame, PatternNode, candidate_ends, typed_text};
use crate::query::QueryContext;
use crate::results::{CompletionItem, ListResult, MatchResult, Segment};

/// A regex that validates a slice of the name. It never produces names on its own.
pub struct RegexPattern {
    pattern: String,
    case_sensitive: bool,
    /// `pattern` anchored at the end of the searched text
    exact: onig::Regex,
}

impl fmt::Debug for RegexPattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "RegexPattern(/{}/", self.pattern)?;
        if !self.case_sensitive {
            write!(f, "i")?;
        }
        write!(f, ")")
    }
}

impl RegexPattern {
    /// Compiles eagerly so a broken regex fails when the tree is built rather than when it
    /// is first queried
    pub fn new(pattern: impl Into<String>, case_sensitive: bool) -> PatternResult<Self> {
        let pattern = pattern.into();
        let options = if case_sensitive {
            RegexOptions::REGEX_OPTION_NONE
        } else {
            RegexOptions::REGEX_OPTION_IGNORECASE
        };
        let invalid = |err: onig::Error| Error::InvalidRegex {
            pattern: pattern.clone(),
            reason: err.to_string(),
        };
        // Validate on its own first so errors point at the user's pattern
        onig::Regex::with_options(&pattern, options, Syntax::default()).map_err(invalid)?;
        let anchored = format!("(?:{pattern})\\z");
        let exact =
            onig::Regex::with_options(&anchored, options, Syntax::default()).map_err(invalid)?;

        Ok(Self {
            pattern,
            case_sensitive,
            exact,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Whether the regex accepts exactly `name[start..end]`
    fn accepts_slice(&self, name: &str, start: usize, end: usize) -> bool {
        // Search the whole head so lookbehinds still see text before `start`
        let Some(head) = name.get(..end) else {
            return false;
        };
        self.exact
            .match_with_options(head, start, SearchOptions::SEARCH_OPTION_NONE, None)
            == Some(end - start)
    }

    /// Whether the regex accepts the whole of `text`
    fn accepts(&self, text: &str) -> bool {
        !text.is_empty() && self.accepts_slice(text, 0, text.len())
    }
}

impl PatternNode for RegexPattern {
    fn match_range(
        &self,
        _ctx: &QueryContext,
        _frame: &Frame,
        name: &str,
        range: Range<usize>,
    ) -> PatternResult<Vec<MatchResult>> {
        // Every accepted length, so an enclosing sequence can hand text back to later children
        Ok(candidate_ends(name, range.clone())
            .into_iter()
            .filter(|&end| self.accepts_slice(name, range.start, end))
            .map(|end| {
                MatchResult::new(vec![Segment::literal(range.start..end)], range.start..end)
            })
            .collect())
    }

    fn list(&self, _ctx: &QueryContext, _frame: &Frame) -> PatternResult<Vec<ListResult>> {
        Ok(Vec::new())
    }

    /// Only a resolver from an enclosing pattern can suggest anything here; its suggestions
    /// are kept when the regex accepts them.
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
            .filter(|item| self.accepts(&item.name))
            .map(|item| item.shifted(start))
            .collect())
    }

    fn static_prefixes(&self) -> Vec<String> {
        vec![String::new()]
    }

    fn is_static_and_required(&self) -> bool {
        false
    }
}
