use std::borrow::Cow;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::ops::Range;
use std::sync::{Arc, OnceLock};

use crate::error::PatternResult;
use crate::patterns::{Frame, Pattern, PatternNode, typed_text};
use crate::query::QueryContext;
use crate::resolver::PatternSymbolsResolver;
use crate::results::{CompletionItem, ListResult, MatchResult, Segment};
use crate::scope::ScopeRef;
use crate::symbols::{ApiStatus, Priority};

/// Policy applied to the alternatives of a [`ComplexPattern`].
#[derive(Clone)]
pub struct ComplexPatternOptions {
    pub(crate) additional_scope: Option<ScopeRef>,
    pub(crate) api_status: Option<ApiStatus>,
    pub(crate) required: bool,
    pub(crate) priority: Option<Priority>,
    pub(crate) repeats: bool,
    pub(crate) unique: bool,
    pub(crate) symbols_resolver: Option<Arc<dyn PatternSymbolsResolver>>,
}

impl Default for ComplexPatternOptions {
    fn default() -> Self {
        Self {
            additional_scope: None,
            api_status: None,
            required: true,
            priority: None,
            repeats: false,
            unique: false,
            symbols_resolver: None,
        }
    }
}

impl ComplexPatternOptions {
    /// Pushed on the scope stack while evaluating the alternatives
    pub fn additional_scope(mut self, scope: ScopeRef) -> Self {
        self.additional_scope = Some(scope);
        self
    }

    /// Overrides the api status of matched symbols and completion items
    pub fn api_status(mut self, status: ApiStatus) -> Self {
        self.api_status = Some(status);
        self
    }

    /// When `false`, an empty match is accepted if no alternative matches.
    /// For repeating patterns this only concerns the first iteration.
    pub fn required(mut self, value: bool) -> Self {
        self.required = value;
        self
    }

    /// Overrides the priority of matched symbols and completion items
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Allows the alternatives to match again right after each other
    pub fn repeats(mut self, value: bool) -> Self {
        self.repeats = value;
        self
    }

    /// Rejects iterations resolving to a symbol name already matched by an earlier one
    pub fn unique(mut self, value: bool) -> Self {
        self.unique = value;
        self
    }

    /// Supplies symbols to the placeholders and regexes below this pattern
    pub fn symbols_resolver(mut self, resolver: Arc<dyn PatternSymbolsResolver>) -> Self {
        self.symbols_resolver = Some(resolver);
        self
    }

    fn override_segment(&self, segment: &mut Segment) {
        if segment.is_literal() {
            return;
        }
        if let Some(priority) = self.priority {
            segment.priority = Some(priority);
        }
        if let Some(status) = &self.api_status {
            segment.api_status = Some(status.clone());
        }
    }

    fn override_item(&self, item: &mut CompletionItem) {
        if let Some(priority) = self.priority {
            item.priority = Some(priority);
        }
        if let Some(status) = &self.api_status {
            item.api_status = Some(status.clone());
        }
    }
}

impl fmt::Debug for ComplexPatternOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComplexPatternOptions")
            .field("additional_scope", &self.additional_scope)
            .field("api_status", &self.api_status)
            .field("required", &self.required)
            .field("priority", &self.priority)
            .field("repeats", &self.repeats)
            .field("unique", &self.unique)
            .field("symbols_resolver", &self.symbols_resolver)
            .finish()
    }
}

pub type OptionsProvider = Arc<dyn Fn(&QueryContext) -> ComplexPatternOptions + Send + Sync>;
pub type PatternsProvider = Arc<dyn Fn(&QueryContext) -> Vec<Pattern> + Send + Sync>;

enum Content {
    Eager {
        options: ComplexPatternOptions,
        patterns: Vec<Pattern>,
    },
    /// Shape depends on the executor, computed again for every query
    Lazy {
        options: OptionsProvider,
        patterns: PatternsProvider,
    },
}

/// Alternatives plus the policy deciding how they combine.
pub struct ComplexPattern {
    content: Content,
    is_static_and_required: bool,
    prefixes: OnceLock<Vec<String>>,
}

/// A partial repeated match and the symbol names its iterations resolved to
#[derive(Clone)]
struct Iteration {
    result: MatchResult,
    names: HashSet<String>,
}

impl ComplexPattern {
    pub fn new(
        options: ComplexPatternOptions,
        is_static_and_required: bool,
        patterns: Vec<Pattern>,
    ) -> Self {
        Self {
            content: Content::Eager { options, patterns },
            is_static_and_required,
            prefixes: OnceLock::new(),
        }
    }

    pub fn new_lazy(options: OptionsProvider, patterns: PatternsProvider) -> Self {
        Self {
            content: Content::Lazy { options, patterns },
            is_static_and_required: false,
            prefixes: OnceLock::new(),
        }
    }

    fn resolve<'s>(
        &'s self,
        ctx: &QueryContext,
    ) -> (Cow<'s, ComplexPatternOptions>, Cow<'s, [Pattern]>) {
        match &self.content {
            Content::Eager { options, patterns } => {
                (Cow::Borrowed(options), Cow::Borrowed(patterns.as_slice()))
            }
            Content::Lazy { options, patterns } => {
                (Cow::Owned(options(ctx)), Cow::Owned(patterns(ctx)))
            }
        }
    }

    fn child_frame(frame: &Frame, options: &ComplexPatternOptions) -> Frame {
        Frame {
            scope: match &options.additional_scope {
                Some(scope) => frame.scope.push(scope.clone()),
                None => frame.scope.clone(),
            },
            resolver: options
                .symbols_resolver
                .clone()
                .or_else(|| frame.resolver.clone()),
        }
    }

    fn compute_prefixes(&self) -> Vec<String> {
        let Content::Eager { options, patterns } = &self.content else {
            return vec![String::new()];
        };
        let mut out = Vec::new();
        for pattern in patterns {
            for prefix in pattern.static_prefixes() {
                if !out.contains(&prefix) {
                    out.push(prefix);
                }
            }
        }
        if (!options.required || out.is_empty()) && !out.iter().any(String::is_empty) {
            out.push(String::new());
        }
        out
    }

    /// Alternatives whose static prefixes fit the text at `start`
    fn viable_for_match<'p>(patterns: &'p [Pattern], name: &str, start: usize) -> Vec<&'p Pattern> {
        let text = name.get(start..).unwrap_or_default();
        patterns
            .iter()
            .filter(|pattern| {
                let viable = pattern.may_match(text);
                #[cfg(feature = "debug")]
                if !viable {
                    log::trace!("[complex] pruned {pattern} at {start}");
                }
                viable
            })
            .collect()
    }

    /// Applies the repeat and unique policy, returning every accepted iteration chain.
    /// Each end offset is reached at most once, by the first chain getting there.
    fn match_repeated(
        ctx: &QueryContext,
        frame: &Frame,
        options: &ComplexPatternOptions,
        patterns: &[Pattern],
        name: &str,
        range: Range<usize>,
    ) -> PatternResult<Vec<Iteration>> {
        let mut accepted = Vec::new();
        let mut queue = VecDeque::from([Iteration {
            result: MatchResult::empty_at(range.start),
            names: HashSet::new(),
        }]);
        let mut visited = HashSet::from([range.start]);

        while let Some(state) = queue.pop_front() {
            let start = state.result.range.end;
            for pattern in Self::viable_for_match(patterns, name, start) {
                ctx.check_cancelled()?;
                let candidates: Vec<_> = pattern
                    .match_in(ctx, frame, name, start..range.end)?
                    .into_iter()
                    // an iteration must make progress or repeating never ends
                    .filter(|m| !m.is_empty())
                    .filter(|m| {
                        !options.unique
                            || m.symbol_names().iter().all(|n| !state.names.contains(*n))
                    })
                    .collect();
                if candidates.is_empty() {
                    continue;
                }

                for candidate in candidates {
                    if !visited.insert(candidate.range.end) {
                        continue;
                    }
                    let mut names = state.names.clone();
                    names.extend(candidate.symbol_names().into_iter().map(str::to_string));
                    let iteration = Iteration {
                        result: state.result.concat(candidate),
                        names,
                    };
                    accepted.push(iteration.clone());
                    queue.push_back(iteration);
                }
                break;
            }
        }

        Ok(accepted)
    }

    fn finish(options: &ComplexPatternOptions, mut results: Vec<MatchResult>) -> Vec<MatchResult> {
        for result in &mut results {
            result.segments.iter_mut().for_each(|s| options.override_segment(s));
        }
        results.sort_by(|a, b| b.range.end.cmp(&a.range.end));
        results
    }

    /// Cross product of `iteration` with itself, at most `limit` deep, skipping iterations
    /// that make no progress or repeat a symbol name when unique
    fn list_repeated(
        ctx: &QueryContext,
        options: &ComplexPatternOptions,
        iteration: &[ListResult],
    ) -> PatternResult<Vec<ListResult>> {
        let mut out = Vec::new();
        let mut layer = vec![ListResult::default()];
        for _ in 0..ctx.list_repeat_limit() {
            ctx.check_cancelled()?;
            let mut next = Vec::new();
            for prefix in &layer {
                let used = prefix.symbol_names();
                for suffix in iteration {
                    if suffix.name.is_empty() {
                        continue;
                    }
                    if options.unique && suffix.symbol_names().iter().any(|n| used.contains(n)) {
                        continue;
                    }
                    next.push(prefix.concat(suffix));
                }
            }
            if next.is_empty() {
                return Ok(out);
            }
            out.extend(next.iter().cloned());
            layer = next;
        }
        #[cfg(feature = "debug")]
        log::debug!(
            "[complex] list stopped after {} repetitions",
            ctx.list_repeat_limit()
        );
        Ok(out)
    }

    pub(crate) fn fmt_preview(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Content::Eager { options, patterns } = &self.content else {
            return write!(f, "{{...}}");
        };
        let body = patterns
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join("|");

        if options.repeats {
            if patterns.len() > 1 {
                write!(f, "({body})")?;
            } else {
                write!(f, "{body}")?;
            }
            write!(f, "{}", if options.required { "+" } else { "*" })
        } else if !options.required {
            write!(f, "[{body}]")
        } else if patterns.len() > 1 {
            write!(f, "({body})")
        } else {
            write!(f, "{body}")
        }
    }
}

impl fmt::Debug for ComplexPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.content {
            Content::Eager { options, patterns } => f
                .debug_struct("ComplexPattern")
                .field("options", options)
                .field("patterns", patterns)
                .finish(),
            Content::Lazy { .. } => write!(f, "ComplexPattern(lazy)"),
        }
    }
}

impl PatternNode for ComplexPattern {
    fn match_range(
        &self,
        ctx: &QueryContext,
        frame: &Frame,
        name: &str,
        range: Range<usize>,
    ) -> PatternResult<Vec<MatchResult>> {
        let (options, patterns) = self.resolve(ctx);
        let child = Self::child_frame(frame, &options);

        let results = if options.repeats {
            Self::match_repeated(ctx, &child, &options, &patterns, name, range.clone())?
                .into_iter()
                .map(|iteration| iteration.result)
                .collect()
        } else {
            let mut first = Vec::new();
            for pattern in Self::viable_for_match(&patterns, name, range.start) {
                ctx.check_cancelled()?;
                first = pattern.match_in(ctx, &child, name, range.clone())?;
                if !first.is_empty() {
                    break;
                }
            }
            first
        };

        if results.is_empty() {
            return Ok(if options.required {
                Vec::new()
            } else {
                vec![MatchResult::empty_at(range.start)]
            });
        }
        Ok(Self::finish(&options, results))
    }

    fn list(&self, ctx: &QueryContext, frame: &Frame) -> PatternResult<Vec<ListResult>> {
        let (options, patterns) = self.resolve(ctx);
        let child = Self::child_frame(frame, &options);

        let mut iteration = Vec::new();
        for pattern in patterns.iter() {
            ctx.check_cancelled()?;
            iteration.extend(pattern.list_in(ctx, &child)?);
        }

        let mut out = if options.repeats {
            Self::list_repeated(ctx, &options, &iteration)?
        } else {
            iteration
        };
        if !options.required {
            out.push(ListResult::default());
        }
        for listed in &mut out {
            listed.segments.iter_mut().for_each(|s| options.override_segment(s));
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
        let (options, patterns) = self.resolve(ctx);
        let child = Self::child_frame(frame, &options);

        // every offset a new iteration may start from, with the names already used on the way
        let mut starts = vec![(start, HashSet::new())];
        if options.repeats {
            for iteration in
                Self::match_repeated(ctx, &child, &options, &patterns, name, start..position)?
            {
                starts.push((iteration.result.range.end, iteration.names));
            }
        }

        let mut items = Vec::new();
        for (offset, used) in starts {
            let Some(typed) = typed_text(name, offset, position) else {
                continue;
            };
            for pattern in patterns.iter().filter(|p| p.may_complete(typed)) {
                ctx.check_cancelled()?;
                for mut item in pattern.complete_in(ctx, &child, name, offset, position)? {
                    if options.unique && used.contains(&item.name) {
                        continue;
                    }
                    options.override_item(&mut item);
                    items.push(item);
                }
            }
        }
        Ok(items)
    }

    fn static_prefixes(&self) -> Vec<String> {
        self.prefixes.get_or_init(|| self.compute_prefixes()).clone()
    }

    fn is_static_and_required(&self) -> bool {
        match &self.content {
            Content::Eager { options, .. } => {
                self.is_static_and_required && options.required && !options.repeats
            }
            Content::Lazy { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::error::Error;
    use crate::factory::*;
    use crate::query::QueryContext;
    use crate::registry::{DefinedSymbol, SymbolRegistry};
    use crate::resolver::{PatternReferenceResolver, Reference};
    use crate::scope::{Scope, ScopeStack};
    use crate::symbols::{QualifiedKind, SymbolRef};

    fn tags() -> QualifiedKind {
        QualifiedKind::new("test", "tags")
    }

    fn tag_registry() -> SymbolRegistry {
        let mut registry = SymbolRegistry::default();
        for name in ["x", "y"] {
            registry.add_symbol(DefinedSymbol::new(tags(), name));
        }
        registry
    }

    fn tag_resolver() -> Arc<dyn PatternSymbolsResolver> {
        Arc::new(PatternReferenceResolver::new(vec![Reference::new(tags())]).unwrap())
    }

    #[test]
    fn optional_pattern_matches_empty() {
        let registry = SymbolRegistry::default();
        let ctx = QueryContext::new(&registry);
        let pattern = create_complex_pattern(
            ComplexPatternOptions::default().required(false),
            true,
            vec![create_static_match("a"), create_static_match("b")],
        );
        let results = pattern
            .match_range(&ctx, &ScopeStack::new(), "zzz", 0..3)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].range, 0..0);

        let required = create_complex_pattern(
            ComplexPatternOptions::default(),
            true,
            vec![create_static_match("a")],
        );
        assert!(required
            .match_range(&ctx, &ScopeStack::new(), "zzz", 0..3)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn first_matching_alternative_wins() {
        let registry = SymbolRegistry::default();
        let ctx = QueryContext::new(&registry);
        let pattern = create_complex_pattern(
            ComplexPatternOptions::default(),
            false,
            vec![create_static_match("ab"), create_static_match("abc")],
        );
        let results = pattern
            .match_range(&ctx, &ScopeStack::new(), "abc", 0..3)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].range, 0..2);
    }

    #[test]
    fn repeats_until_nothing_matches() {
        let registry = SymbolRegistry::default();
        let ctx = QueryContext::new(&registry);
        let pattern = create_complex_pattern(
            ComplexPatternOptions::default().repeats(true),
            false,
            vec![create_static_match("ab"), create_static_match("c")],
        );
        let results = pattern
            .match_range(&ctx, &ScopeStack::new(), "abcabx", 0..6)
            .unwrap();
        let ends: Vec<_> = results.iter().map(|r| r.range.end).collect();
        assert_eq!(ends, vec![5, 3, 2]);
        assert_eq!(pattern.match_name(&ctx, &ScopeStack::new(), "abcab").unwrap().len(), 1);
    }

    #[test]
    fn required_repeat_needs_one_iteration() {
        let registry = SymbolRegistry::default();
        let ctx = QueryContext::new(&registry);
        let required = create_complex_pattern(
            ComplexPatternOptions::default().repeats(true),
            false,
            vec![create_static_match("a")],
        );
        assert!(required.match_name(&ctx, &ScopeStack::new(), "").unwrap().is_empty());

        let optional = create_complex_pattern(
            ComplexPatternOptions::default().repeats(true).required(false),
            false,
            vec![create_static_match("a")],
        );
        assert_eq!(optional.match_name(&ctx, &ScopeStack::new(), "").unwrap().len(), 1);
        assert_eq!(optional.match_name(&ctx, &ScopeStack::new(), "aaa").unwrap().len(), 1);
    }

    #[test]
    fn unique_rejects_repeated_symbols() {
        let registry = tag_registry();
        let ctx = QueryContext::new(&registry);
        let options = ComplexPatternOptions::default()
            .repeats(true)
            .symbols_resolver(tag_resolver());
        let item = vec![create_symbol_reference_placeholder(Some("tag"))];

        let unique = create_complex_pattern(options.clone().unique(true), false, item.clone());
        let results = unique
            .match_range(&ctx, &ScopeStack::new(), "xyx", 0..3)
            .unwrap();
        assert_eq!(results[0].range, 0..2);
        insta::assert_snapshot!(results[0].describe("xyx"), @"[x:x][y:y]");
        assert!(unique.match_name(&ctx, &ScopeStack::new(), "xyx").unwrap().is_empty());

        let repeated = create_complex_pattern(options, false, item);
        let results = repeated.match_name(&ctx, &ScopeStack::new(), "xyx").unwrap();
        assert_eq!(results.len(), 1);
        insta::assert_snapshot!(results[0].describe("xyx"), @"[x:x][y:y][x:x]");
    }

    #[test]
    fn overrides_priority_and_api_status() {
        let registry = tag_registry();
        let ctx = QueryContext::new(&registry);
        let pattern = create_complex_pattern(
            ComplexPatternOptions::default()
                .symbols_resolver(tag_resolver())
                .priority(Priority::High)
                .api_status(ApiStatus::Deprecated(Some("use z".to_string()))),
            false,
            vec![create_symbol_reference_placeholder(None)],
        );
        let results = pattern.match_name(&ctx, &ScopeStack::new(), "x").unwrap();
        let segment = &results[0].segments[0];
        assert_eq!(segment.priority, Some(Priority::High));
        assert!(segment.api_status.as_ref().unwrap().is_deprecated_or_obsolete());

        let items = pattern.complete(&ctx, &ScopeStack::new(), "", 0).unwrap();
        assert_eq!(items.items.len(), 2);
        assert!(items.items.iter().all(|i| i.priority == Some(Priority::High)));
    }

    #[derive(Debug)]
    struct ExtraTags;

    impl Scope for ExtraTags {
        fn symbols(&self, kind: &QualifiedKind) -> Vec<SymbolRef> {
            if *kind == tags() {
                vec![Arc::new(DefinedSymbol::new(tags(), "z"))]
            } else {
                Vec::new()
            }
        }
    }

    #[test]
    fn additional_scope_is_only_visible_to_children() {
        let registry = tag_registry();
        let ctx = QueryContext::new(&registry);
        let scoped = create_complex_pattern(
            ComplexPatternOptions::default()
                .symbols_resolver(tag_resolver())
                .additional_scope(Arc::new(ExtraTags)),
            false,
            vec![create_symbol_reference_placeholder(None)],
        );
        let sibling = create_complex_pattern(
            ComplexPatternOptions::default().symbols_resolver(tag_resolver()),
            false,
            vec![create_symbol_reference_placeholder(None)],
        );
        let pattern = create_pattern_sequence(vec![
            scoped,
            create_static_match("."),
            sibling,
        ]);

        assert_eq!(pattern.match_name(&ctx, &ScopeStack::new(), "z.x").unwrap().len(), 1);
        assert!(pattern.match_name(&ctx, &ScopeStack::new(), "x.z").unwrap().is_empty());
    }

    #[test]
    fn prunes_alternatives_by_static_prefix() {
        let registry = SymbolRegistry::default();
        let ctx = QueryContext::new(&registry);
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let lazy = create_lazy_complex_pattern(
            Arc::new(|_: &QueryContext| ComplexPatternOptions::default()),
            Arc::new(move |_: &QueryContext| {
                counted.fetch_add(1, Ordering::SeqCst);
                vec![create_static_match("never")]
            }),
        );
        let pattern = create_complex_pattern(
            ComplexPatternOptions::default(),
            false,
            vec![
                create_pattern_sequence(vec![create_static_match("b-"), lazy]),
                create_static_match("a-1"),
            ],
        );

        assert_eq!(pattern.static_prefixes(), vec!["b-", "a-1"]);
        assert_eq!(pattern.match_name(&ctx, &ScopeStack::new(), "a-1").unwrap().len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn lazy_patterns_are_built_per_query() {
        let mut registry = SymbolRegistry::default();
        registry.add_symbol(DefinedSymbol::new(tags(), "x"));
        let ctx = QueryContext::new(&registry).with_owner(Arc::new(DefinedSymbol::new(
            QualifiedKind::new("test", "owners"),
            "wide",
        )));
        let pattern = create_lazy_complex_pattern(
            Arc::new(|_: &QueryContext| ComplexPatternOptions::default()),
            Arc::new(|ctx: &QueryContext| match ctx.owner().map(|o| o.name()) {
                Some("wide") => vec![create_static_match("wide")],
                _ => vec![create_static_match("narrow")],
            }),
        );

        assert_eq!(pattern.match_name(&ctx, &ScopeStack::new(), "wide").unwrap().len(), 1);
        let plain = QueryContext::new(&registry);
        assert_eq!(pattern.match_name(&plain, &ScopeStack::new(), "narrow").unwrap().len(), 1);
        assert!(!pattern.is_static_and_required());
        assert_eq!(pattern.to_string(), "{...}");
    }

    #[test]
    fn lists_alternatives_and_repetitions() {
        let registry = tag_registry();
        let ctx = QueryContext::new(&registry).with_list_repeat_limit(2);
        let pattern = create_complex_pattern(
            ComplexPatternOptions::default()
                .repeats(true)
                .unique(true)
                .symbols_resolver(tag_resolver()),
            false,
            vec![create_symbol_reference_placeholder(None)],
        );
        let listed = pattern.list(&ctx, &ScopeStack::new()).unwrap();
        let names: Vec<_> = listed.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y", "xy", "yx"]);

        let optional = create_complex_pattern(
            ComplexPatternOptions::default().required(false),
            true,
            vec![create_static_match("a"), create_static_match("b")],
        );
        let listed = optional.list(&ctx, &ScopeStack::new()).unwrap();
        let names: Vec<_> = listed.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", ""]);
    }

    #[test]
    fn completes_every_viable_alternative() {
        let registry = SymbolRegistry::default();
        let ctx = QueryContext::new(&registry);
        let pattern = create_complex_pattern(
            ComplexPatternOptions::default(),
            false,
            vec![
                create_static_match("item"),
                create_static_match("items"),
                create_static_match("other"),
                create_static_match("item"),
            ],
        );
        let results = pattern.complete(&ctx, &ScopeStack::new(), "it", 2).unwrap();
        assert_eq!(results.names(), vec!["item", "items"]);

        // "item" is complete already, yet "items" still continues it
        let results = pattern.complete(&ctx, &ScopeStack::new(), "item", 4).unwrap();
        assert_eq!(results.names(), vec!["items"]);
    }

    #[test]
    fn completes_after_repeated_iterations() {
        let registry = tag_registry();
        let ctx = QueryContext::new(&registry);
        let pattern = create_complex_pattern(
            ComplexPatternOptions::default()
                .repeats(true)
                .unique(true)
                .symbols_resolver(tag_resolver()),
            false,
            vec![create_symbol_reference_placeholder(None)],
        );
        let results = pattern.complete(&ctx, &ScopeStack::new(), "x", 1).unwrap();
        let rendered: Vec<_> = results.items.iter().map(|i| i.to_string()).collect();
        // "x" may be retyped in place, or followed by anything but another "x"
        assert_eq!(rendered, vec!["x@0", "y@1"]);
    }

    #[test]
    fn cancellation_propagates() {
        let registry = tag_registry();
        let token = CancellationToken::new();
        token.cancel();
        let ctx = QueryContext::new(&registry).with_cancellation(token);
        let pattern = create_complex_pattern(
            ComplexPatternOptions::default().symbols_resolver(tag_resolver()),
            false,
            vec![create_symbol_reference_placeholder(None)],
        );
        let err = pattern.match_name(&ctx, &ScopeStack::new(), "x").unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(pattern.list(&ctx, &ScopeStack::new()).unwrap_err().is_cancelled());
        assert!(pattern
            .complete(&ctx, &ScopeStack::new(), "x", 1)
            .unwrap_err()
            .is_cancelled());
    }
}
