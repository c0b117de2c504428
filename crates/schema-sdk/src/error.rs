//! Error types for the schema SDK.
//!
//! Every error is `Clone`: a single failed fetch is shared by all callers
//! that were waiting on it, so each of them receives its own copy.

use std::time::Duration;

/// Errors raised while reaching the schema store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The HTTP request could not be sent or the connection dropped.
    #[error("Network error: {0}")]
    Network(String),

    /// The store answered with a non-success status code.
    #[error("HTTP error: status {status} from {url}")]
    Http {
        /// Status code returned by the store.
        status: u16,
        /// URL that was requested.
        url: String,
    },

    /// The fetch did not complete within the configured bound.
    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The document exceeded the maximum accepted size.
    #[error("Response exceeds maximum size of {max_size} bytes")]
    ResponseTooLarge {
        /// The maximum allowed size.
        max_size: usize,
    },

    /// Reading the document from the local schema directory failed.
    #[error("IO error: {0}")]
    Io(String),
}

/// Errors produced by the schema SDK.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// The schema store could not be reached.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The document or the composed GraphQL SDL is malformed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An accessor was used before any schema document was available.
    #[error("Schema data has not been hydrated; await ready() before reading the schema")]
    NotHydrated,

    /// The SDK options are incomplete or inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// No type with this name exists in the schema.
    #[error("Invalid type `{0}`")]
    InvalidType(String),

    /// No string pattern with this name exists in the schema.
    #[error("Invalid string pattern `{0}`")]
    InvalidStringPattern(String),

    /// The type has no property with this name.
    #[error("Invalid property `{property}` on type `{type_name}`")]
    InvalidProperty {
        /// Type that was inspected.
        type_name: String,
        /// Property that does not exist.
        property: String,
    },

    /// A value does not satisfy the property definition.
    #[error("Invalid value for `{type_name}.{property}`: {reason}")]
    InvalidValue {
        /// Type owning the property.
        type_name: String,
        /// Property being validated.
        property: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl SchemaError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn invalid_value(
        type_name: impl Into<String>,
        property: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            type_name: type_name.into(),
            property: property.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if retrying the same operation later may succeed.
    ///
    /// Only store failures are transient; everything else points at the
    /// document, the options or the caller.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type for schema SDK operations
pub type Result<T> = std::result::Result<T, SchemaError>;
