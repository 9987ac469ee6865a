//! Index definitions, document preparation, and the search backend contract.
//!
//! This crate maps application records onto search documents. An index
//! definition declares how each document field is derived from a record;
//! a search index binds that definition to a record source and a backend
//! and drives updates, removals, clears and reindexes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      quarry-index                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  FieldDescriptor (kind, source, document/indexed/stored)    │
//! │  IndexDefinition (builder, inheritance, locale fan-out)     │
//! │  Extractor (attribute, template, custom hooks)              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  DocumentPreparer (per-locale re-fetch and aggregation)     │
//! │  SearchIndex (update, update_one, remove_one, reindex)      │
//! │  IndexRegistry (one index per record type, change events)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  RecordSource trait                                         │
//! │  └── MemorySource (in-memory, per-locale overlays)          │
//! │  SearchBackend trait                                        │
//! │  └── MemoryBackend (linear scan, facets, highlighting)      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Translatable fields
//!
//! With languages `[en, fr]`, marking `text` translatable produces the
//! fields `text`, `text__en` and `text__fr`. `text__fr` holds the value of
//! the record fetched in French; `text` holds `" " + value` for every
//! language in order, e.g. `" Hello Bonjour"`.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use quarry_core::{RecordType, Settings};
//! use quarry_index::{FieldDescriptor, IndexDefinition, MemoryBackend, MemorySource, SearchIndex};
//!
//! let settings = Settings::with_languages(["en", "fr"]);
//! let definition = IndexDefinition::builder("NoteIndex")
//!     .field("text", FieldDescriptor::text().document().use_template())
//!     .field("author", FieldDescriptor::text().model_attr("user.name"))
//!     .translatable(["text"])
//!     .build(&settings)?;
//!
//! let source = Arc::new(MemorySource::new(RecordType::new("core", "note")));
//! let backend = Arc::new(MemoryBackend::new(&settings));
//! let index = SearchIndex::new(definition, source, backend)?;
//! index.reindex().await?;
//! ```

pub mod backend;
pub mod extract;
pub mod field;
pub mod index;
pub mod memory;
pub mod prepare;
pub mod registry;
pub mod schema;
pub mod source;
pub mod template;

// Re-exports
pub use backend::{
    DateFacet, DateGap, Facets, GapUnit, QueryFacet, SearchBackend, SearchHit, SearchParams,
    SearchResults, document_id,
};
pub use extract::{
    AttributeExtractor, CustomExtractor, DefaultExtractor, ExtractContext, Extractor,
    TemplateExtractor,
};
pub use field::{FieldDescriptor, FieldKind, FieldSource};
pub use index::{ChangeEvent, SearchIndex};
pub use memory::{MAX_DATE_BUCKETS, MemoryBackend, StoredDocument};
pub use prepare::{Document, DocumentPreparer};
pub use registry::IndexRegistry;
pub use schema::{IndexDefinition, IndexDefinitionBuilder, Schema};
pub use source::{MemorySource, RecordSource};
pub use template::{TemplateContext, TemplateError, TemplateRenderer, TemplateStore};
