//! Quarry Core: shared types, errors, and settings.
//!
//! This crate provides the foundational types used across all Quarry crates.
//! It has no internal Quarry dependencies.
//!
//! # Modules
//!
//! - [`error`]: Error families and the `Result` alias
//! - [`value`]: Dynamically-typed attribute and document values
//! - [`record`]: Records and record types handed over by the storage layer
//! - [`locale`]: Locales and configured languages
//! - [`settings`]: Indexing settings (languages, batching, templates)

pub mod error;
pub mod locale;
pub mod record;
pub mod settings;
pub mod value;

// Re-export key types at crate root for convenience
pub use error::{
    BackendError, ConfigError, Error, ExtractionError, Result, SchemaError, SourceError,
};
pub use locale::{Language, Locale};
pub use record::{Record, RecordType};
pub use settings::{LOCALE_SEPARATOR, Settings};
pub use value::Value;
