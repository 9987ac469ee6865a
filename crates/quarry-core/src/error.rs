//! Error types for quarry-core.
//!
//! Every failure in the indexing layer belongs to one of five families:
//!
//! - [`SchemaError`]: the index definition is malformed (build time, fatal)
//! - [`ExtractionError`]: a field value could not be derived for one record
//! - [`SourceError`]: the record source could not produce a record
//! - [`BackendError`]: the search backend failed
//! - [`ConfigError`]: settings could not be parsed or validated
//!
//! [`Error`] wraps all of them so callers can use a single `Result` type.
//! Nothing in this workspace catches and suppresses these errors; they always
//! propagate to the immediate caller.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for quarry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for quarry operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The index definition is invalid.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// A field value could not be extracted from a record.
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// The record source failed.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// The search backend failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Settings are invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An index is already registered for this record type.
    #[error("Record type '{record_type}' is already registered")]
    AlreadyRegistered {
        /// Record type tag.
        record_type: String,
    },

    /// No index is registered for this record type.
    #[error("Record type '{record_type}' is not registered")]
    NotRegistered {
        /// Record type tag.
        record_type: String,
    },

    /// I/O error with the offending path.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Wrap an I/O error together with the path it occurred on.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config(ConfigError::Invalid {
            message: message.into(),
        })
    }

    /// Returns whether retrying the failed operation might succeed.
    ///
    /// Transport failures and I/O are transient; schema, extraction, and
    /// configuration errors are programming or data errors and are permanent.
    /// Quarry never retries on its own; this is a hint for callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Backend(e) => e.is_retryable(),
            Error::Source(e) => matches!(e, SourceError::Unavailable { .. }),
            Error::Io { .. } => true,
            Error::Schema(_)
            | Error::Extraction(_)
            | Error::Config(_)
            | Error::AlreadyRegistered { .. }
            | Error::NotRegistered { .. } => false,
        }
    }
}

/// Errors in an index definition, raised while building a schema or
/// constructing an index.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
    /// An index must have exactly one document field.
    #[error(
        "index '{}' must have one (and only one) document field, found {}: [{}]",
        .index,
        .count,
        .fields.join(", ")
    )]
    DocumentFieldCount {
        /// Name of the offending index definition.
        index: String,
        /// Number of fields flagged as the document field.
        count: usize,
        /// Names of the flagged fields.
        fields: Vec<String>,
    },

    /// A translatable field name does not refer to a declared field.
    #[error("index '{index}' marks '{field}' as translatable, but no such field exists")]
    UnknownTranslatableField {
        /// Name of the offending index definition.
        index: String,
        /// The missing field.
        field: String,
    },

    /// An override hook was registered for a field that does not exist.
    #[error("index '{index}' registers a prepare hook for unknown field '{field}'")]
    UnknownHookField {
        /// Name of the offending index definition.
        index: String,
        /// The missing field.
        field: String,
    },

    /// A field declaration is malformed.
    #[error("index '{index}' declares invalid field '{field}': {reason}")]
    InvalidField {
        /// Name of the offending index definition.
        index: String,
        /// Field name as declared.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The settings used to expand translatable fields are invalid.
    #[error("index '{index}' cannot be built: {source}")]
    InvalidSettings {
        /// Name of the offending index definition.
        index: String,
        /// The settings validation failure.
        #[source]
        source: ConfigError,
    },
}

/// Errors deriving a single field value for a record.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ExtractionError {
    /// The attribute path does not exist on the record and no default is set.
    #[error("field '{field}': record {record} has no attribute '{path}'")]
    MissingAttribute {
        /// Field being prepared.
        field: String,
        /// Identity of the record.
        record: String,
        /// Attribute path that failed to resolve.
        path: String,
    },

    /// The template could not be rendered.
    #[error("field '{field}': failed to render template '{template}': {message}")]
    Template {
        /// Field being prepared.
        field: String,
        /// Template that was requested.
        template: String,
        /// Renderer diagnostic.
        message: String,
    },

    /// The extracted value does not fit the field kind.
    #[error("field '{field}': cannot convert {found} to {expected}")]
    Conversion {
        /// Field being prepared.
        field: String,
        /// Kind the field expects.
        expected: String,
        /// Description of the value found.
        found: String,
    },

    /// A custom extraction hook failed.
    #[error("field '{field}': {message}")]
    Custom {
        /// Field being prepared.
        field: String,
        /// Hook diagnostic.
        message: String,
    },
}

impl ExtractionError {
    /// Creates a missing-attribute error.
    pub fn missing(
        field: impl Into<String>,
        record: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        ExtractionError::MissingAttribute {
            field: field.into(),
            record: record.into(),
            path: path.into(),
        }
    }

    /// Creates a custom hook error.
    pub fn custom(field: impl Into<String>, message: impl Into<String>) -> Self {
        ExtractionError::Custom {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Name of the field that failed.
    pub fn field(&self) -> &str {
        match self {
            ExtractionError::MissingAttribute { field, .. }
            | ExtractionError::Template { field, .. }
            | ExtractionError::Conversion { field, .. }
            | ExtractionError::Custom { field, .. } => field,
        }
    }
}

/// Errors raised by a record source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SourceError {
    /// No record with the given primary key.
    #[error("record {record_type}.{pk} not found")]
    NotFound {
        /// Record type tag.
        record_type: String,
        /// Primary key that was requested.
        pk: String,
    },

    /// The storage layer could not be reached.
    #[error("record source unavailable: {message}")]
    Unavailable {
        /// Storage diagnostic.
        message: String,
    },

    /// The requested filter is not supported by this source.
    #[error("unsupported filter on '{field}': {message}")]
    UnsupportedFilter {
        /// Field the filter was applied to.
        field: String,
        /// Why it is unsupported.
        message: String,
    },
}

/// Errors raised by a search backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BackendError {
    /// The backend could not be reached or the connection broke.
    #[error("{backend}: transport failure: {message}")]
    Transport {
        /// Backend name.
        backend: String,
        /// Transport diagnostic.
        message: String,
    },

    /// The backend rejected the request.
    #[error("{backend}: request rejected: {message}")]
    Rejected {
        /// Backend name.
        backend: String,
        /// Backend diagnostic.
        message: String,
    },

    /// The search request was malformed.
    #[error("{backend}: invalid query '{query}': {message}")]
    InvalidQuery {
        /// Backend name.
        backend: String,
        /// Offending query.
        query: String,
        /// Why it is invalid.
        message: String,
    },
}

impl BackendError {
    /// Returns whether the failure is transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BackendError::Transport { .. })
    }
}

/// Errors loading or validating settings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// The settings document could not be parsed.
    #[error("failed to parse settings: {message}")]
    Parse {
        /// Parser diagnostic.
        message: String,
    },

    /// The settings parsed but are not usable.
    #[error("{message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}

// ============================================================================
// Tests
// ============================================================================
