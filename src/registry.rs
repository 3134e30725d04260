use std::fmt;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{Error, PatternResult};
use crate::patterns::Pattern;
use crate::query::{NameConversionRule, NameConverter, QueryContext, SymbolQueryExecutor};
use crate::raw::RawPattern;
use crate::results::CompletionItem;
use crate::scope::ScopeStack;
use crate::symbols::{
    ApiStatus, MatchedSymbol, Modifier, Priority, QualifiedKind, QualifiedName, Symbol, SymbolRef,
};

/// A symbol declared up front, as opposed to one produced by matching a pattern.
#[derive(Debug, Clone)]
pub struct DefinedSymbol {
    kind: QualifiedKind,
    name: String,
    priority: Option<Priority>,
    api_status: Option<ApiStatus>,
    modifiers: Vec<Modifier>,
    members: Vec<SymbolRef>,
    pattern: Option<Pattern>,
}

impl DefinedSymbol {
    pub fn new(kind: QualifiedKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            priority: None,
            api_status: None,
            modifiers: Vec::new(),
            members: Vec::new(),
            pattern: None,
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn api_status(mut self, status: ApiStatus) -> Self {
        self.api_status = Some(status);
        self
    }

    pub fn modifiers(mut self, modifiers: Vec<Modifier>) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Symbols reachable by paths going through this one
    pub fn members(mut self, members: Vec<DefinedSymbol>) -> Self {
        self.members = members
            .into_iter()
            .map(|m| Arc::new(m) as SymbolRef)
            .collect();
        self
    }

    /// Makes this symbol stand for every name `pattern` accepts. The declared name is
    /// still what paths use to refer to the definition itself.
    pub fn name_pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = Some(pattern);
        self
    }
}

impl Symbol for DefinedSymbol {
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

    fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    fn members(&self) -> &[SymbolRef] {
        &self.members
    }

    fn pattern(&self) -> Option<&Pattern> {
        self.pattern.as_ref()
    }
}

/// A symbol as written in a registry JSON file
///
/// # Examples
/// ```json
/// {
///   "namespace": "html",
///   "kind": "elements",
///   "name": "div",
///   "priority": "high",
///   "members": [
///     { "namespace": "html", "kind": "attributes", "name": "title" }
///   ]
/// }
/// ```
///
/// ```json
/// {
///   "namespace": "vue",
///   "kind": "props",
///   "name": "model",
///   "pattern": ["model:", { "regex": "[a-z]+" }],
///   "api_status": { "status": "experimental", "message": null }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawSymbol {
    #[serde(flatten)]
    pub name: QualifiedName,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub api_status: Option<ApiStatus>,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    #[serde(default)]
    pub pattern: Option<RawPattern>,
    #[serde(default)]
    pub members: Vec<RawSymbol>,
}

impl RawSymbol {
    pub fn compile(&self) -> PatternResult<DefinedSymbol> {
        self.name.validate()?;
        let mut symbol = DefinedSymbol::new(self.name.kind.clone(), self.name.name.clone())
            .modifiers(self.modifiers.clone())
            .members(
                self.members
                    .iter()
                    .map(RawSymbol::compile)
                    .collect::<PatternResult<Vec<_>>>()?,
            );
        if let Some(priority) = self.priority {
            symbol = symbol.priority(priority);
        }
        if let Some(status) = &self.api_status {
            symbol = symbol.api_status(status.clone());
        }
        if let Some(pattern) = &self.pattern {
            symbol = symbol.name_pattern(pattern.compile()?);
        }
        Ok(symbol)
    }
}

type MatchCacheKey = (Vec<QualifiedName>, Vec<Modifier>);

/// An in-memory symbol registry.
///
/// Top-level symbols are looked up by kind, nested ones through the `members` of the
/// symbols named by the path. Scope contributions are only visible at the top level.
#[derive(Clone, Default)]
pub struct SymbolRegistry {
    symbols: Arc<Vec<SymbolRef>>,
    name_conversion_rules: Vec<NameConversionRule>,
    // name matches for queries without scope or conversion, reset on every insertion
    match_cache: Arc<papaya::HashMap<MatchCacheKey, Vec<SymbolRef>>>,
}

impl SymbolRegistry {
    pub fn add_symbol(&mut self, symbol: DefinedSymbol) {
        Arc::make_mut(&mut self.symbols).push(Arc::new(symbol));
        self.match_cache = Arc::default();
    }

    /// Adds every symbol of a JSON array of [`RawSymbol`]
    pub fn add_symbols_from_str(&mut self, json: &str) -> PatternResult<()> {
        let raw_symbols: Vec<RawSymbol> = serde_json::from_str(json)?;
        for raw in &raw_symbols {
            self.add_symbol(raw.compile()?);
        }
        Ok(())
    }

    /// Reads the file and adds the symbols it declares
    pub fn add_symbols_from_path(&mut self, path: impl AsRef<Path>) -> PatternResult<()> {
        let file = File::open(&path)?;
        let raw_symbols: Vec<RawSymbol> = serde_json::from_reader(&file)?;
        for raw in &raw_symbols {
            self.add_symbol(raw.compile()?);
        }
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> PatternResult<Self> {
        let mut registry = Self::default();
        registry.add_symbols_from_path(path)?;
        Ok(registry)
    }

    /// Top-level symbols, in insertion order
    pub fn symbols(&self) -> &[SymbolRef] {
        &self.symbols
    }

    fn converter(&self, kind: &QualifiedKind) -> Option<NameConverter> {
        // later rules win
        self.name_conversion_rules
            .iter()
            .rev()
            .find(|rule| rule.kind == *kind)
            .map(|rule| rule.converter)
    }

    fn same_name(&self, kind: &QualifiedKind, declared: &str, requested: &str) -> bool {
        match self.converter(kind) {
            Some(converter) => converter.convert(declared) == converter.convert(requested),
            None => declared == requested,
        }
    }

    fn continues_name(&self, kind: &QualifiedKind, declared: &str, typed: &str) -> bool {
        match self.converter(kind) {
            Some(converter) => converter.convert(declared).starts_with(&converter.convert(typed)),
            None => declared.starts_with(typed),
        }
    }

    /// Symbols of `kind` directly under `containers`, or at the top level when `None`
    fn candidates(
        &self,
        containers: Option<&[SymbolRef]>,
        kind: &QualifiedKind,
        scope: &ScopeStack,
    ) -> Vec<SymbolRef> {
        match containers {
            None => scope
                .symbols(kind)
                .into_iter()
                .chain(
                    self.symbols
                        .iter()
                        .filter(|s| s.qualified_kind() == kind)
                        .cloned(),
                )
                .collect(),
            Some(containers) => containers
                .iter()
                .flat_map(|c| c.members().iter())
                .filter(|s| s.qualified_kind() == kind)
                .cloned()
                .collect(),
        }
    }

    /// Follows `location` step by step. `None` stands for the top level.
    fn navigate(&self, location: &[QualifiedName], scope: &ScopeStack) -> Option<Vec<SymbolRef>> {
        let mut containers: Option<Vec<SymbolRef>> = None;
        for step in location {
            let found = self
                .candidates(containers.as_deref(), &step.kind, scope)
                .into_iter()
                .filter(|s| self.same_name(&step.kind, s.name(), &step.name))
                .collect();
            containers = Some(found);
        }
        containers
    }

    fn visible(
        &self,
        location: &[QualifiedName],
        kind: &QualifiedKind,
        exclude_modifiers: &[Modifier],
        scope: &ScopeStack,
    ) -> Vec<SymbolRef> {
        let containers = self.navigate(location, scope);
        self.candidates(containers.as_deref(), kind, scope)
            .into_iter()
            .filter(|s| !s.modifiers().iter().any(|m| exclude_modifiers.contains(m)))
            .collect()
    }

    fn match_uncached(
        &self,
        ctx: &QueryContext<'_>,
        location: &[QualifiedName],
        target: &QualifiedName,
        exclude_modifiers: &[Modifier],
        scope: &ScopeStack,
    ) -> PatternResult<Vec<SymbolRef>> {
        let mut out = Vec::new();
        for symbol in self.visible(location, &target.kind, exclude_modifiers, scope) {
            if self.same_name(&target.kind, symbol.name(), &target.name) {
                out.push(symbol);
                continue;
            }
            let Some(pattern) = symbol.pattern() else {
                continue;
            };
            let ctx = ctx.for_executor(self);
            if let Some(result) = pattern
                .match_name(&ctx, scope, &target.name)?
                .into_iter()
                .next()
            {
                out.push(Arc::new(MatchedSymbol {
                    kind: symbol.qualified_kind().clone(),
                    name: target.name.clone(),
                    segments: result.segments,
                    priority: symbol.priority(),
                    api_status: symbol.api_status().cloned(),
                }));
            }
        }
        Ok(out)
    }
}

fn split_path(path: &[QualifiedName]) -> PatternResult<(&QualifiedName, &[QualifiedName])> {
    path.split_last()
        .ok_or_else(|| Error::InvalidPath("path is empty".to_string()))
}

impl SymbolQueryExecutor for SymbolRegistry {
    fn name_match_query(
        &self,
        ctx: &QueryContext<'_>,
        path: &[QualifiedName],
        exclude_modifiers: &[Modifier],
        additional_scope: &ScopeStack,
    ) -> PatternResult<Vec<SymbolRef>> {
        let (target, location) = split_path(path)?;
        if !additional_scope.is_empty() || !self.name_conversion_rules.is_empty() {
            return self.match_uncached(
                ctx,
                location,
                target,
                exclude_modifiers,
                additional_scope,
            );
        }

        let key = (path.to_vec(), exclude_modifiers.to_vec());
        let cache = self.match_cache.pin();
        if let Some(found) = cache.get(&key) {
            return Ok(found.clone());
        }
        let found =
            self.match_uncached(ctx, location, target, exclude_modifiers, additional_scope)?;
        cache.insert(key, found.clone());
        Ok(found)
    }

    fn list_symbols_query(
        &self,
        ctx: &QueryContext<'_>,
        path: &[QualifiedName],
        kind: &QualifiedKind,
        expand_patterns: bool,
        exclude_modifiers: &[Modifier],
        additional_scope: &ScopeStack,
    ) -> PatternResult<Vec<SymbolRef>> {
        let mut out = Vec::new();
        for symbol in self.visible(path, kind, exclude_modifiers, additional_scope) {
            let expanded = if expand_patterns {
                symbol.pattern().cloned()
            } else {
                None
            };
            let Some(pattern) = expanded else {
                out.push(symbol);
                continue;
            };
            let ctx = ctx.for_executor(self);
            for listed in pattern.list(&ctx, additional_scope)? {
                if listed.name.is_empty() {
                    continue;
                }
                out.push(Arc::new(MatchedSymbol {
                    kind: symbol.qualified_kind().clone(),
                    name: listed.name,
                    segments: listed.segments,
                    priority: symbol.priority(),
                    api_status: symbol.api_status().cloned(),
                }));
            }
        }
        Ok(out)
    }

    fn code_completion_query(
        &self,
        ctx: &QueryContext<'_>,
        path: &[QualifiedName],
        position: usize,
        exclude_modifiers: &[Modifier],
        additional_scope: &ScopeStack,
    ) -> PatternResult<Vec<CompletionItem>> {
        let (target, location) = split_path(path)?;
        let typed = target
            .name
            .get(..position.min(target.name.len()))
            .unwrap_or_default();

        let mut out = Vec::new();
        for symbol in self.visible(location, &target.kind, exclude_modifiers, additional_scope) {
            if let Some(pattern) = symbol.pattern() {
                let ctx = ctx.for_executor(self);
                out.extend(
                    pattern
                        .complete(&ctx, additional_scope, &target.name, typed.len())?
                        .items,
                );
            } else if self.continues_name(&target.kind, symbol.name(), typed) {
                out.push(CompletionItem::for_symbol(symbol, 0));
            }
        }
        Ok(out)
    }

    fn with_name_conversion_rules(
        &self,
        rules: &[NameConversionRule],
    ) -> Arc<dyn SymbolQueryExecutor> {
        let mut view = self.clone();
        view.name_conversion_rules.extend(rules.iter().cloned());
        Arc::new(view)
    }
}

impl fmt::Debug for SymbolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolRegistry")
            .field("symbols", &self.symbols.len())
            .field("name_conversion_rules", &self.name_conversion_rules)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::factory::*;
    use crate::patterns::ComplexPatternOptions;
    use crate::scope::Scope;

    fn elements() -> QualifiedKind {
        QualifiedKind::new("html", "elements")
    }

    fn attributes() -> QualifiedKind {
        QualifiedKind::new("html", "attributes")
    }

    fn registry() -> SymbolRegistry {
        let mut registry = SymbolRegistry::default();
        registry.add_symbol(
            DefinedSymbol::new(elements(), "div").members(vec![
                DefinedSymbol::new(attributes(), "title"),
                DefinedSymbol::new(attributes(), "hidden").priority(Priority::Low),
            ]),
        );
        registry.add_symbol(DefinedSymbol::new(attributes(), "id"));
        registry.add_symbol(
            DefinedSymbol::new(attributes(), "aria").name_pattern(create_pattern_sequence(vec![
                create_static_match("aria-"),
                create_complex_pattern(
                    Default::default(),
                    true,
                    vec![create_static_match("busy"), create_static_match("hidden")],
                ),
            ])),
        );
        registry
    }

    fn names(symbols: &[SymbolRef]) -> Vec<&str> {
        symbols.iter().map(|s| s.name()).collect()
    }

    #[test]
    fn follows_paths_through_members() {
        let registry = registry();
        let ctx = QueryContext::new(&registry);
        let scope = ScopeStack::new();
        let div = QualifiedName::new("html", "elements", "div");

        let found = registry
            .name_match_query(
                &ctx,
                &[div.clone(), attributes().with_name("title")],
                &[],
                &scope,
            )
            .unwrap();
        assert_eq!(names(&found), vec!["title"]);
        // `id` is top level, not a member of div
        assert!(registry
            .name_match_query(&ctx, &[div.clone(), attributes().with_name("id")], &[], &scope)
            .unwrap()
            .is_empty());

        let listed = registry
            .list_symbols_query(&ctx, &[div], &attributes(), false, &[], &scope)
            .unwrap();
        assert_eq!(names(&listed), vec!["title", "hidden"]);
        assert!(registry.name_match_query(&ctx, &[], &[], &scope).is_err());
    }

    #[test]
    fn matches_pattern_named_symbols() {
        let registry = registry();
        let ctx = QueryContext::new(&registry);
        let scope = ScopeStack::new();

        let found = registry
            .name_match_query(&ctx, &[attributes().with_name("aria")], &[], &scope)
            .unwrap();
        assert!(found[0].pattern().is_some());

        let found = registry
            .name_match_query(&ctx, &[attributes().with_name("aria-busy")], &[], &scope)
            .unwrap();
        assert_eq!(names(&found), vec!["aria-busy"]);
        assert!(found[0].pattern().is_none());
        assert_eq!(found[0].name_segments().len(), 2);

        let listed = registry
            .list_symbols_query(&ctx, &[], &attributes(), true, &[], &scope)
            .unwrap();
        assert_eq!(names(&listed), vec!["id", "aria-busy", "aria-hidden"]);
        let listed = registry
            .list_symbols_query(&ctx, &[], &attributes(), false, &[], &scope)
            .unwrap();
        assert_eq!(names(&listed), vec!["id", "aria"]);
    }

    #[test]
    fn completes_by_prefix() {
        let registry = registry();
        let ctx = QueryContext::new(&registry);
        let scope = ScopeStack::new();
        let items = registry
            .code_completion_query(&ctx, &[attributes().with_name("i")], 1, &[], &scope)
            .unwrap();
        let names: Vec<_> = items.iter().map(|i| i.to_string()).collect();
        assert_eq!(names, vec!["id@0"]);

        let items = registry
            .code_completion_query(&ctx, &[attributes().with_name("aria-b")], 6, &[], &scope)
            .unwrap();
        let names: Vec<_> = items.iter().map(|i| i.to_string()).collect();
        assert_eq!(names, vec!["busy@5"]);
    }

    #[test]
    fn excludes_modifiers() {
        let mut registry = SymbolRegistry::default();
        registry.add_symbol(DefinedSymbol::new(attributes(), "base").modifiers(vec![
            Modifier::Abstract,
            Modifier::Readonly,
        ]));
        let ctx = QueryContext::new(&registry);
        let path = [attributes().with_name("base")];
        let scope = ScopeStack::new();
        assert_eq!(registry.name_match_query(&ctx, &path, &[], &scope).unwrap().len(), 1);
        assert!(registry
            .name_match_query(&ctx, &path, &[Modifier::Readonly], &scope)
            .unwrap()
            .is_empty());
    }

    #[derive(Debug)]
    struct Slots;

    impl Scope for Slots {
        fn symbols(&self, kind: &QualifiedKind) -> Vec<SymbolRef> {
            if *kind == attributes() {
                vec![Arc::new(DefinedSymbol::new(attributes(), "slot"))]
            } else {
                Vec::new()
            }
        }
    }

    #[test]
    fn sees_scope_contributions_at_the_top_level() {
        let registry = registry();
        let ctx = QueryContext::new(&registry);
        let path = [attributes().with_name("slot")];
        assert!(registry
            .name_match_query(&ctx, &path, &[], &ScopeStack::new())
            .unwrap()
            .is_empty());

        let scope = ScopeStack::new().push(Arc::new(Slots));
        assert_eq!(registry.name_match_query(&ctx, &path, &[], &scope).unwrap().len(), 1);
        let listed = registry
            .list_symbols_query(&ctx, &[], &attributes(), false, &[], &scope)
            .unwrap();
        assert_eq!(names(&listed), vec!["slot", "id", "aria"]);
    }

    /// Cancels the query the first time the registry asks it for symbols
    #[derive(Debug)]
    struct CancelOnLookup(CancellationToken);

    impl Scope for CancelOnLookup {
        fn symbols(&self, _: &QualifiedKind) -> Vec<SymbolRef> {
            self.0.cancel();
            Vec::new()
        }
    }

    #[test]
    fn name_patterns_share_the_callers_cancellation() {
        let registry = registry();
        let token = CancellationToken::new();
        let ctx = QueryContext::new(&registry).with_cancellation(token.clone());
        let scope = ScopeStack::new().push(Arc::new(CancelOnLookup(token)));

        let result =
            registry.name_match_query(&ctx, &[attributes().with_name("aria-busy")], &[], &scope);
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn name_patterns_share_the_callers_repeat_limit() {
        let mut registry = SymbolRegistry::default();
        registry.add_symbol(DefinedSymbol::new(attributes(), "a").name_pattern(
            create_complex_pattern(
                ComplexPatternOptions::default().repeats(true),
                true,
                vec![create_static_match("a")],
            ),
        ));
        let ctx = QueryContext::new(&registry).with_list_repeat_limit(2);

        let listed = registry
            .list_symbols_query(&ctx, &[], &attributes(), true, &[], &ScopeStack::new())
            .unwrap();
        assert_eq!(names(&listed), vec!["a", "aa"]);
    }

    #[test]
    fn applies_name_conversion_rules() {
        let events = QualifiedKind::new("js", "events");
        let mut registry = SymbolRegistry::default();
        registry.add_symbol(DefinedSymbol::new(events.clone(), "onClick"));
        let ctx = QueryContext::new(&registry);
        let scope = ScopeStack::new();
        let path = [events.with_name("on-click")];

        assert!(registry.name_match_query(&ctx, &path, &[], &scope).unwrap().is_empty());
        let view = registry.with_name_conversion_rules(&[NameConversionRule::new(
            events.clone(),
            NameConverter::KebabCase,
        )]);
        let found = view.name_match_query(&ctx, &path, &[], &scope).unwrap();
        assert_eq!(names(&found), vec!["onClick"]);

        let items = view
            .code_completion_query(&ctx, &[events.with_name("on-c")], 4, &[], &scope)
            .unwrap();
        assert_eq!(items[0].name, "onClick");
    }

    #[test]
    fn cache_is_reset_on_insertion() {
        let mut registry = registry();
        let path = [attributes().with_name("lang")];
        let scope = ScopeStack::new();
        let found = registry
            .name_match_query(&QueryContext::new(&registry), &path, &[], &scope)
            .unwrap();
        assert!(found.is_empty());
        registry.add_symbol(DefinedSymbol::new(attributes(), "lang"));
        let found = registry
            .name_match_query(&QueryContext::new(&registry), &path, &[], &scope)
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn can_load_from_json() {
        let mut registry = SymbolRegistry::default();
        registry
            .add_symbols_from_str(
                r#"[
                    { "namespace": "vue", "kind": "props", "name": "model",
                      "pattern": ["model:", { "regex": "[a-z]+" }],
                      "api_status": { "status": "deprecated", "message": "use v-bind" } },
                    { "namespace": "html", "kind": "elements", "name": "div",
                      "members": [{ "namespace": "html", "kind": "attributes", "name": "title" }] }
                ]"#,
            )
            .unwrap();
        assert_eq!(registry.symbols().len(), 2);
        assert!(registry.symbols()[0].pattern().is_some());
        assert_eq!(
            registry.symbols()[0].api_status(),
            Some(&ApiStatus::Deprecated(Some("use v-bind".to_string())))
        );
        assert_eq!(registry.symbols()[1].members().len(), 1);

        assert!(registry.add_symbols_from_str("{").is_err());
        assert!(registry
            .add_symbols_from_str(r#"[{ "namespace": "", "kind": "props", "name": "x" }]"#)
            .is_err());
    }
}
