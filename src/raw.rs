//! Serde front-end for pattern trees, compiled through the factory.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::PatternResult;
use crate::factory::{
    create_complex_pattern, create_completion_auto_popup, create_pattern_sequence,
    create_regex_match, create_single_symbol_reference_pattern, create_static_match_with_case,
    create_symbol_reference_placeholder,
};
use crate::patterns::{ComplexPatternOptions, Pattern};
use crate::query::NameConversionRule;
use crate::resolver::{PatternReferenceResolver, Reference};
use crate::symbols::{ApiStatus, Modifier, Priority, QualifiedKind, QualifiedName};

fn default_true() -> bool {
    true
}

/// A regex validating a slice of the name
///
/// # Examples
/// ```json
/// { "regex": "[0-9]+", "case_sensitive": false }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawRegex {
    pub regex: String,
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
}

/// A literal that can ignore ASCII case. Plain strings are case-sensitive literals.
///
/// # Examples
/// ```json
/// { "literal": "Data-", "case_sensitive": false }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawLiteral {
    pub literal: String,
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
}

/// A fixed reference to the symbols at `reference`
///
/// # Examples
/// ```json
/// { "reference": [{ "namespace": "html", "kind": "elements", "name": "div" }] }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawSingleReference {
    pub reference: Vec<QualifiedName>,
}

/// The value is the sticky flag
///
/// # Examples
/// ```json
/// { "auto_popup": false }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawAutoPopup {
    pub auto_popup: bool,
}

/// Where a placeholder below a complex pattern is looked up
///
/// # Examples
/// ```json
/// {
///   "namespace": "html",
///   "kind": "attributes",
///   "location": [{ "namespace": "html", "kind": "elements", "name": "div" }],
///   "name_conversion": [{ "namespace": "html", "kind": "attributes", "converter": "lowercase" }]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawReference {
    #[serde(flatten)]
    pub kind: QualifiedKind,
    #[serde(default)]
    pub location: Vec<QualifiedName>,
    /// Defaults to excluding abstract symbols
    #[serde(default)]
    pub exclude_modifiers: Option<Vec<Modifier>>,
    #[serde(default)]
    pub name_conversion: Vec<NameConversionRule>,
}

impl RawReference {
    pub fn to_reference(&self) -> Reference {
        let mut reference = Reference::new(self.kind.clone())
            .location(self.location.clone())
            .name_conversion_rules(self.name_conversion.clone());
        if let Some(modifiers) = &self.exclude_modifiers {
            reference = reference.exclude_modifiers(modifiers.clone());
        }
        reference
    }
}

/// Alternatives plus their policy
///
/// # Examples
/// ```json
/// {
///   "or": [{ "regex": "[0-9]+" }, { "placeholder": "event" }],
///   "references": [{ "namespace": "js", "kind": "events" }],
///   "repeats": true,
///   "unique": true,
///   "required": false,
///   "priority": "high",
///   "api_status": { "status": "deprecated", "message": "use v-on" }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawComplex {
    pub or: Vec<RawPattern>,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub repeats: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub api_status: Option<ApiStatus>,
    /// Resolver for the placeholders and regexes below
    #[serde(default)]
    pub references: Vec<RawReference>,
    /// Whether every alternative always consumes exactly its static prefix
    #[serde(default, rename = "static")]
    pub is_static: bool,
}

/// A placeholder filled by the nearest enclosing `references`
///
/// # Examples
/// ```json
/// { "placeholder": "attribute-name" }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPlaceholder {
    #[serde(default)]
    pub placeholder: Option<String>,
}

/// Union of every pattern shape accepted in JSON
///
/// The order matters for serde deserialization: shapes with a required distinctive key are
/// tried first and the placeholder, which has none, comes last.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawPattern {
    /// `"data-"`
    Static(String),
    /// `["data-", { "placeholder": null }]`
    Sequence(Vec<RawPattern>),
    Literal(RawLiteral),
    Regex(RawRegex),
    SingleReference(RawSingleReference),
    AutoPopup(RawAutoPopup),
    Complex(RawComplex),
    Placeholder(RawPlaceholder),
}

impl RawPattern {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> PatternResult<Self> {
        let file = File::open(&path)?;
        let raw_pattern = serde_json::from_reader(&file)?;
        Ok(raw_pattern)
    }

    pub fn load_from_str(json: &str) -> PatternResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Fails on invalid regexes, malformed paths and malformed references
    pub fn compile(&self) -> PatternResult<Pattern> {
        match self {
            RawPattern::Static(text) => Ok(create_static_match_with_case(text.as_str(), true)),
            RawPattern::Literal(raw) => Ok(create_static_match_with_case(
                raw.literal.as_str(),
                raw.case_sensitive,
            )),
            RawPattern::Sequence(children) => Ok(create_pattern_sequence(
                children
                    .iter()
                    .map(RawPattern::compile)
                    .collect::<PatternResult<Vec<_>>>()?,
            )),
            RawPattern::Regex(raw) => create_regex_match(&raw.regex, raw.case_sensitive),
            RawPattern::SingleReference(raw) => {
                create_single_symbol_reference_pattern(raw.reference.clone())
            }
            RawPattern::AutoPopup(raw) => Ok(create_completion_auto_popup(raw.auto_popup)),
            RawPattern::Placeholder(raw) => {
                Ok(create_symbol_reference_placeholder(raw.placeholder.as_deref()))
            }
            RawPattern::Complex(raw) => raw.compile(),
        }
    }
}

impl RawComplex {
    fn compile(&self) -> PatternResult<Pattern> {
        let mut options = ComplexPatternOptions::default()
            .required(self.required)
            .repeats(self.repeats)
            .unique(self.unique);
        if let Some(priority) = self.priority {
            options = options.priority(priority);
        }
        if let Some(status) = &self.api_status {
            options = options.api_status(status.clone());
        }
        if !self.references.is_empty() {
            let resolver = PatternReferenceResolver::new(
                self.references.iter().map(RawReference::to_reference).collect(),
            )?;
            options = options.symbols_resolver(Arc::new(resolver));
        }

        let children = self
            .or
            .iter()
            .map(RawPattern::compile)
            .collect::<PatternResult<Vec<_>>>()?;
        Ok(create_complex_pattern(options, self.is_static, children))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::query::QueryContext;
    use crate::registry::SymbolRegistry;
    use crate::scope::ScopeStack;

    #[test]
    fn can_deserialize_every_shape() {
        let raw = RawPattern::load_from_str(
            r#"[
                "v-on:",
                { "auto_popup": true },
                { "literal": "X", "case_sensitive": false },
                { "regex": "[a-z]+" },
                { "reference": [{ "namespace": "vue", "kind": "props", "name": "value" }] },
                { "or": ["a", "b"], "required": false, "static": true },
                { "placeholder": "event" },
                {}
            ]"#,
        )
        .unwrap();
        let RawPattern::Sequence(children) = &raw else {
            panic!("expected a sequence, got {raw:?}");
        };
        assert!(matches!(children[0], RawPattern::Static(_)));
        assert!(matches!(children[1], RawPattern::AutoPopup(_)));
        assert!(matches!(children[2], RawPattern::Literal(_)));
        assert!(matches!(children[3], RawPattern::Regex(_)));
        assert!(matches!(children[4], RawPattern::SingleReference(_)));
        assert!(matches!(children[5], RawPattern::Complex(_)));
        assert!(matches!(children[6], RawPattern::Placeholder(_)));
        assert!(matches!(children[7], RawPattern::Placeholder(_)));

        let pattern = raw.compile().unwrap();
        insta::assert_snapshot!(pattern.to_string(), @"v-on:X/[a-z]+/<vue/props/value>[a|b]{event}{symbol}");
    }

    #[test]
    fn reports_invalid_regexes() {
        let raw = RawPattern::load_from_str(r#"{ "regex": "(" }"#).unwrap();
        assert!(raw.compile().is_err());
        assert!(RawPattern::load_from_str(r#"{ "regex": 1 }"#).is_err());
    }

    #[test]
    fn can_load_fixtures() {
        let registry = SymbolRegistry::load_from_file("src/fixtures/symbols.json").unwrap();
        let ctx = QueryContext::new(&registry);
        let scope = ScopeStack::new();

        for entry in fs::read_dir("src/fixtures/patterns").unwrap() {
            let path = entry.unwrap().path();
            println!("Checking {path:?}");
            let pattern = RawPattern::load_from_file(&path).unwrap().compile().unwrap();
            assert!(!pattern.list(&ctx, &scope).unwrap().is_empty());
        }
    }

    #[test]
    fn compiles_vue_event_bindings() {
        let registry = SymbolRegistry::load_from_file("src/fixtures/symbols.json").unwrap();
        let ctx = QueryContext::new(&registry);
        let pattern = RawPattern::load_from_file("src/fixtures/patterns/vue-on.json")
            .unwrap()
            .compile()
            .unwrap();

        let results = pattern
            .match_name(&ctx, &ScopeStack::new(), "v-on:click.stop.prevent")
            .unwrap();
        assert_eq!(results.len(), 1);
        insta::assert_snapshot!(
            results[0].describe("v-on:click.stop.prevent"),
            @"[v-on:][click:click][.][stop:stop][.][prevent:prevent]"
        );
        // modifiers are unique
        assert!(pattern
            .match_name(&ctx, &ScopeStack::new(), "v-on:click.stop.stop")
            .unwrap()
            .is_empty());

        let items = pattern.complete(&ctx, &ScopeStack::new(), "v-on:click.", 11).unwrap();
        assert_eq!(items.names(), vec!["prevent", "stop"]);
    }
}
