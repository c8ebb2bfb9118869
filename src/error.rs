//! Error types for the OData to SPARQL translation pipeline.

use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for query translation and execution.
///
/// Each variant corresponds to one failure class: a construct with no SPARQL
/// translation, a gap in the metadata mapping, a failed endpoint round trip,
/// a malformed request, a service configuration problem, or a failure inside
/// the embedded result store. Literal coercion failures are recovered locally
/// by the feed generator and never surface here.
#[derive(Error, Debug)]
pub enum Error {
    /// Query node, operator or function with no SPARQL translation target
    #[error("Unsupported construct: {0}")]
    UnsupportedConstruct(String),

    /// Metadata lacks a mapping or annotation the translation requires
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// The remote SPARQL endpoint call failed or timed out
    #[error("Transport error: {0}")]
    Transport(String),

    /// The request URI or one of its query options could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Service settings are missing or inconsistent
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The embedded store used for result reshaping failed
    #[error("Store error: {0}")]
    Store(String),
}

impl From<oxigraph::store::StorageError> for Error {
    fn from(err: oxigraph::store::StorageError) -> Self {
        Error::Store(err.to_string())
    }
}

impl From<oxigraph::sparql::QueryEvaluationError> for Error {
    fn from(err: oxigraph::sparql::QueryEvaluationError) -> Self {
        Error::Store(err.to_string())
    }
}
