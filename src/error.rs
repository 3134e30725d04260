use std::fmt;

pub type PatternResult<T> = Result<T, Error>;

/// Errors that can occur while building or querying name patterns
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// A regex pattern failed to compile.
    /// Only happens when constructing a pattern tree, never while querying it.
    #[allow(missing_docs)]
    InvalidRegex { pattern: String, reason: String },

    /// A qualified path or qualified name was malformed, eg an empty kind or name segment.
    /// Only happens when constructing a pattern tree or a reference.
    InvalidPath(String),

    /// JSON parsing failed when loading raw patterns or a symbol registry.
    Json(serde_json::Error),

    /// Reading a pattern or symbol file failed.
    Io(std::io::Error),

    /// The symbol registry failed to answer a query.
    /// The query engine swallows these per leaf and treats them as "no symbols".
    Query(String),

    /// The query was cancelled through its cancellation token.
    /// Always propagated unchanged to the caller.
    Cancelled,
}

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidRegex { pattern, reason } => {
                write!(f, "invalid regex '{}': {}", pattern, reason)
            }
            Error::InvalidPath(message) => write!(f, "invalid qualified path: {}", message),
            Error::Json(err) => write!(f, "JSON parsing error: {}", err),
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Query(message) => write!(f, "symbol query failed: {}", message),
            Error::Cancelled => write!(f, "query cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::InvalidRegex { .. }
            | Error::InvalidPath(_)
            | Error::Query(_)
            | Error::Cancelled => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
