//! Bridges pattern leaves to the symbol registry.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, PatternResult};
use crate::query::{NameConversionRule, QueryContext, SymbolQueryExecutor};
use crate::results::CompletionItem;
use crate::scope::ScopeStack;
use crate::symbols::{Modifier, QualifiedKind, QualifiedName, SymbolRef, validate_path};

/// Supplies symbols for the placeholders and regexes below a `ComplexPattern`.
pub trait PatternSymbolsResolver: fmt::Debug + Send + Sync {
    fn match_name(
        &self,
        ctx: &QueryContext,
        scope: &ScopeStack,
        name: &str,
    ) -> PatternResult<Vec<SymbolRef>>;

    fn list_symbols(
        &self,
        ctx: &QueryContext,
        scope: &ScopeStack,
        expand_patterns: bool,
    ) -> PatternResult<Vec<SymbolRef>>;

    /// Item offsets are relative to the start of `name`
    fn code_completion(
        &self,
        ctx: &QueryContext,
        scope: &ScopeStack,
        name: &str,
        position: usize,
    ) -> PatternResult<Vec<CompletionItem>>;
}

/// Post-filters what a [`Reference`] gets back from the registry.
pub trait SymbolFilter: fmt::Debug + Send + Sync {
    fn filter_symbols(&self, symbols: Vec<SymbolRef>, scope: &ScopeStack) -> Vec<SymbolRef>;

    /// Keeps items without a symbol, and items whose symbol survives `filter_symbols`
    fn filter_completions(
        &self,
        items: Vec<CompletionItem>,
        scope: &ScopeStack,
    ) -> Vec<CompletionItem> {
        items
            .into_iter()
            .filter(|item| match &item.symbol {
                Some(symbol) => !self
                    .filter_symbols(vec![symbol.clone()], scope)
                    .is_empty(),
                None => true,
            })
            .collect()
    }
}

/// Where a name slot is looked up: `location` leads to the container, `kind` is what is
/// looked up in it.
#[derive(Debug, Clone)]
pub struct Reference {
    pub location: Vec<QualifiedName>,
    pub kind: QualifiedKind,
    pub filter: Option<Arc<dyn SymbolFilter>>,
    pub exclude_modifiers: Vec<Modifier>,
    pub name_conversion_rules: Vec<NameConversionRule>,
}

impl Reference {
    pub fn new(kind: QualifiedKind) -> Self {
        Self {
            location: Vec::new(),
            kind,
            filter: None,
            exclude_modifiers: vec![Modifier::Abstract],
            name_conversion_rules: Vec::new(),
        }
    }

    pub fn location(mut self, location: Vec<QualifiedName>) -> Self {
        self.location = location;
        self
    }

    pub fn filter(mut self, filter: Arc<dyn SymbolFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn exclude_modifiers(mut self, modifiers: Vec<Modifier>) -> Self {
        self.exclude_modifiers = modifiers;
        self
    }

    pub fn name_conversion_rules(mut self, rules: Vec<NameConversionRule>) -> Self {
        self.name_conversion_rules = rules;
        self
    }

    /// Fails on malformed location steps or kind
    pub fn validate(&self) -> PatternResult<()> {
        if !self.location.is_empty() {
            validate_path(&self.location)?;
        }
        self.kind.validate()
    }

    fn path_with_name(&self, name: &str) -> Vec<QualifiedName> {
        let mut path = self.location.clone();
        path.push(self.kind.with_name(name));
        path
    }

    /// Runs `f` against the executor, or against a view carrying this reference's
    /// conversion rules when it has any
    fn with_executor<T>(
        &self,
        ctx: &QueryContext,
        f: impl FnOnce(&dyn SymbolQueryExecutor) -> PatternResult<T>,
    ) -> PatternResult<T> {
        if self.name_conversion_rules.is_empty() {
            f(ctx.executor())
        } else {
            let view = ctx
                .executor()
                .with_name_conversion_rules(&self.name_conversion_rules);
            f(view.as_ref())
        }
    }

    fn apply_filter(&self, symbols: Vec<SymbolRef>, scope: &ScopeStack) -> Vec<SymbolRef> {
        match &self.filter {
            Some(filter) => filter.filter_symbols(symbols, scope),
            None => symbols,
        }
    }
}

/// Treats a registry failure as "nothing found" while letting cancellation through.
#[cfg_attr(not(feature = "debug"), allow(unused_variables))]
pub(crate) fn or_nothing<T>(result: PatternResult<Vec<T>>, what: &str) -> PatternResult<Vec<T>> {
    match result {
        Ok(values) => Ok(values),
        Err(Error::Cancelled) => Err(Error::Cancelled),
        Err(err) => {
            #[cfg(feature = "debug")]
            log::warn!("[{what}] registry query failed, treating as no symbols: {err}");
            Ok(Vec::new())
        }
    }
}

/// Resolver backed by one or more [`Reference`]s, queried independently and concatenated.
#[derive(Debug, Clone)]
pub struct PatternReferenceResolver {
    references: Vec<Reference>,
}

impl PatternReferenceResolver {
    pub fn new(references: Vec<Reference>) -> PatternResult<Self> {
        references.iter().try_for_each(Reference::validate)?;
        Ok(Self { references })
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }
}

impl PatternSymbolsResolver for PatternReferenceResolver {
    fn match_name(
        &self,
        ctx: &QueryContext,
        scope: &ScopeStack,
        name: &str,
    ) -> PatternResult<Vec<SymbolRef>> {
        let mut out = Vec::new();
        for reference in &self.references {
            ctx.check_cancelled()?;
            let path = reference.path_with_name(name);
            let found = or_nothing(
                reference.with_executor(ctx, |executor| {
                    executor.name_match_query(ctx, &path, &reference.exclude_modifiers, scope)
                }),
                "match_name",
            )?;
            out.extend(unwrap_single_segment(reference.apply_filter(found, scope)));
        }
        Ok(out)
    }

    fn list_symbols(
        &self,
        ctx: &QueryContext,
        scope: &ScopeStack,
        expand_patterns: bool,
    ) -> PatternResult<Vec<SymbolRef>> {
        let mut out = Vec::new();
        for reference in &self.references {
            ctx.check_cancelled()?;
            let found = or_nothing(
                reference.with_executor(ctx, |executor| {
                    executor.list_symbols_query(
                        ctx,
                        &reference.location,
                        &reference.kind,
                        expand_patterns,
                        &reference.exclude_modifiers,
                        scope,
                    )
                }),
                "list_symbols",
            )?;
            out.extend(reference.apply_filter(found, scope));
        }
        Ok(out)
    }

    fn code_completion(
        &self,
        ctx: &QueryContext,
        scope: &ScopeStack,
        name: &str,
        position: usize,
    ) -> PatternResult<Vec<CompletionItem>> {
        let mut out = Vec::new();
        for reference in &self.references {
            ctx.check_cancelled()?;
            let path = reference.path_with_name(name);
            let items = or_nothing(
                reference.with_executor(ctx, |executor| {
                    executor.code_completion_query(
                        ctx,
                        &path,
                        position,
                        &reference.exclude_modifiers,
                        scope,
                    )
                }),
                "code_completion",
            )?;
            out.extend(match &reference.filter {
                Some(filter) => filter.filter_completions(items, scope),
                None => items,
            });
        }
        Ok(out)
    }
}

/// A sole symbol that is just a wrapper around one matched segment is replaced by the
/// symbols of that segment.
fn unwrap_single_segment(symbols: Vec<SymbolRef>) -> Vec<SymbolRef> {
    if let [only] = symbols.as_slice()
        && let [segment] = only.name_segments()
        && !segment.symbols.is_empty()
        && segment.range.len() == only.name().len()
    {
        return segment.symbols.clone();
    }
    symbols
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{DefinedSymbol, SymbolRegistry};
    use crate::symbols::QualifiedKind;

    fn attributes() -> QualifiedKind {
        QualifiedKind::new("html", "attributes")
    }

    fn registry() -> SymbolRegistry {
        let mut registry = SymbolRegistry::default();
        registry.add_symbol(DefinedSymbol::new(attributes(), "foo"));
        registry.add_symbol(DefinedSymbol::new(attributes(), "fob"));
        registry.add_symbol(
            DefinedSymbol::new(attributes(), "base").modifiers(vec![Modifier::Abstract]),
        );
        registry.add_symbol(DefinedSymbol::new(QualifiedKind::new("css", "properties"), "foo"));
        registry
    }

    #[derive(Debug)]
    struct NoF;

    impl SymbolFilter for NoF {
        fn filter_symbols(&self, symbols: Vec<SymbolRef>, _: &ScopeStack) -> Vec<SymbolRef> {
            symbols
                .into_iter()
                .filter(|s| !s.name().starts_with("fob"))
                .collect()
        }
    }

    struct Offline;

    impl SymbolQueryExecutor for Offline {
        fn name_match_query(
            &self,
            _: &QueryContext<'_>,
            _: &[QualifiedName],
            _: &[Modifier],
            _: &ScopeStack,
        ) -> PatternResult<Vec<SymbolRef>> {
            Err(Error::Query("offline".to_string()))
        }

        fn list_symbols_query(
            &self,
            _: &QueryContext<'_>,
            _: &[QualifiedName],
            _: &QualifiedKind,
            _: bool,
            _: &[Modifier],
            _: &ScopeStack,
        ) -> PatternResult<Vec<SymbolRef>> {
            Err(Error::Query("offline".to_string()))
        }

        fn code_completion_query(
            &self,
            _: &QueryContext<'_>,
            _: &[QualifiedName],
            _: usize,
            _: &[Modifier],
            _: &ScopeStack,
        ) -> PatternResult<Vec<CompletionItem>> {
            Err(Error::Query("offline".to_string()))
        }

        fn with_name_conversion_rules(
            &self,
            _: &[NameConversionRule],
        ) -> Arc<dyn SymbolQueryExecutor> {
            Arc::new(Offline)
        }
    }

    #[test]
    fn registry_failures_read_as_no_symbols() {
        let ctx = QueryContext::new(&Offline);
        let scope = ScopeStack::new();
        let resolver = PatternReferenceResolver::new(vec![Reference::new(attributes())]).unwrap();

        assert!(resolver.match_name(&ctx, &scope, "foo").unwrap().is_empty());
        assert!(resolver.list_symbols(&ctx, &scope, true).unwrap().is_empty());
        assert!(resolver.code_completion(&ctx, &scope, "f", 1).unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_references() {
        assert!(PatternReferenceResolver::new(vec![Reference::new(QualifiedKind::new("", "x"))])
            .is_err());
        assert!(PatternReferenceResolver::new(vec![
            Reference::new(attributes()).location(vec![QualifiedName::new("html", "elements", "")])
        ])
        .is_err());
    }

    #[test]
    fn matches_names_through_each_reference() {
        let registry = registry();
        let ctx = QueryContext::new(&registry);
        let resolver = PatternReferenceResolver::new(vec![
            Reference::new(attributes()),
            Reference::new(QualifiedKind::new("css", "properties")),
        ])
        .unwrap();

        let found = resolver.match_name(&ctx, &ScopeStack::new(), "foo").unwrap();
        let kinds: Vec<_> = found.iter().map(|s| s.qualified_kind().to_string()).collect();
        assert_eq!(kinds, vec!["html/attributes", "css/properties"]);
    }

    #[test]
    fn excludes_abstract_symbols_by_default() {
        let registry = registry();
        let ctx = QueryContext::new(&registry);
        let resolver = PatternReferenceResolver::new(vec![Reference::new(attributes())]).unwrap();
        assert!(resolver.match_name(&ctx, &ScopeStack::new(), "base").unwrap().is_empty());

        let resolver = PatternReferenceResolver::new(vec![
            Reference::new(attributes()).exclude_modifiers(vec![]),
        ])
        .unwrap();
        assert_eq!(resolver.match_name(&ctx, &ScopeStack::new(), "base").unwrap().len(), 1);
    }

    #[test]
    fn applies_filters_to_lists_and_completions() {
        let registry = registry();
        let ctx = QueryContext::new(&registry);
        let resolver =
            PatternReferenceResolver::new(vec![Reference::new(attributes()).filter(Arc::new(NoF))])
                .unwrap();

        let listed = resolver.list_symbols(&ctx, &ScopeStack::new(), false).unwrap();
        let names: Vec<_> = listed.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["foo"]);

        let items = resolver
            .code_completion(&ctx, &ScopeStack::new(), "fo", 2)
            .unwrap();
        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["foo"]);
    }
}
