mod error;
mod patterns;
mod query;
mod raw;
mod registry;
mod resolver;
mod results;
mod scope;
mod symbols;

pub mod factory;

pub use error::{Error, PatternResult};
pub use patterns::{
    AutoPopupPattern, ComplexPattern, ComplexPatternOptions, OptionsProvider, Pattern,
    PatternsProvider, RegexPattern, SequencePattern, SingleReferencePattern, StaticPattern,
    SymbolPlaceholderPattern,
};
pub use query::{
    DEFAULT_LIST_REPEAT_LIMIT, NameConversionRule, NameConverter, QueryContext,
    SymbolQueryExecutor,
};
pub use raw::{
    RawAutoPopup, RawComplex, RawLiteral, RawPattern, RawPlaceholder, RawReference, RawRegex,
    RawSingleReference,
};
pub use registry::{DefinedSymbol, RawSymbol, SymbolRegistry};
pub use resolver::{PatternReferenceResolver, PatternSymbolsResolver, Reference, SymbolFilter};
pub use results::{CompletionItem, CompletionResults, ListResult, MatchResult, Segment};
pub use scope::{Scope, ScopeRef, ScopeStack};
pub use symbols::{
    ApiStatus, MatchedSymbol, Modifier, Priority, QualifiedKind, QualifiedName, Symbol,
    SymbolRef,
};

/// Re-exported so callers can cancel queries without depending on `tokio-util` themselves
pub use tokio_util::sync::CancellationToken;
