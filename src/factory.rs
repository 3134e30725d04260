//! Constructors for every pattern node.
//!
//! These are the only way to build a [`Pattern`] tree; nodes are immutable once built.

use std::sync::Arc;

use crate::error::PatternResult;
use crate::patterns::{
    AutoPopupPattern, ComplexPattern, ComplexPatternOptions, OptionsProvider, Pattern,
    PatternsProvider, RegexPattern, SequencePattern, SingleReferencePattern, StaticPattern,
    SymbolPlaceholderPattern,
};
use crate::resolver::{PatternReferenceResolver, Reference};
use crate::symbols::QualifiedName;

/// A case-sensitive literal
pub fn create_static_match(text: impl Into<String>) -> Pattern {
    create_static_match_with_case(text, true)
}

pub fn create_static_match_with_case(text: impl Into<String>, case_sensitive: bool) -> Pattern {
    Pattern::Static(Arc::new(StaticPattern::new(text, case_sensitive)))
}

/// Fails if `pattern` is not a valid regex
pub fn create_regex_match(pattern: &str, case_sensitive: bool) -> PatternResult<Pattern> {
    Ok(Pattern::Regex(Arc::new(RegexPattern::new(
        pattern,
        case_sensitive,
    )?)))
}

pub fn create_symbol_reference_placeholder(display_name: Option<&str>) -> Pattern {
    Pattern::SymbolPlaceholder(Arc::new(SymbolPlaceholderPattern::new(
        display_name.map(str::to_string),
    )))
}

pub fn create_completion_auto_popup(sticky: bool) -> Pattern {
    Pattern::AutoPopup(AutoPopupPattern::new(sticky))
}

/// Fails if `path` is empty or has a malformed step
pub fn create_single_symbol_reference_pattern(path: Vec<QualifiedName>) -> PatternResult<Pattern> {
    Ok(Pattern::SingleReference(Arc::new(
        SingleReferencePattern::new(path)?,
    )))
}

pub fn create_pattern_sequence(children: Vec<Pattern>) -> Pattern {
    Pattern::Sequence(Arc::new(SequencePattern::new(children)))
}

/// `is_static_and_required` declares that every alternative always consumes exactly its
/// static prefix, which lets enclosing sequences prune on more than the first child.
pub fn create_complex_pattern(
    options: ComplexPatternOptions,
    is_static_and_required: bool,
    children: Vec<Pattern>,
) -> Pattern {
    Pattern::Complex(Arc::new(ComplexPattern::new(
        options,
        is_static_and_required,
        children,
    )))
}

/// Options and alternatives are rebuilt for every query from the query context
pub fn create_lazy_complex_pattern(
    options: OptionsProvider,
    patterns: PatternsProvider,
) -> Pattern {
    Pattern::Complex(Arc::new(ComplexPattern::new_lazy(options, patterns)))
}

/// Shorthand for the most common shape: one placeholder resolved through `references`
pub fn create_reference_pattern(
    references: Vec<Reference>,
    display_name: Option<&str>,
) -> PatternResult<Pattern> {
    let resolver = PatternReferenceResolver::new(references)?;
    Ok(create_complex_pattern(
        ComplexPatternOptions::default().symbols_resolver(Arc::new(resolver)),
        false,
        vec![create_symbol_reference_placeholder(display_name)],
    ))
}
