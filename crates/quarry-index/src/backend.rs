//! Search backend contract.
//!
//! This module defines the `SearchBackend` trait that every search engine
//! adapter must satisfy, plus the types for search parameters and results.
//!
//! # Backends
//!
//! - [`crate::MemoryBackend`]: in-process storage and linear-scan search,
//!   used for tests and small deployments
//!
//! Network engines live outside this crate and implement the same trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use quarry_index::{SearchBackend, SearchParams};
//!
//! let params = SearchParams {
//!     query: "hello".to_string(),
//!     highlight: true,
//!     facets: vec!["author".to_string()],
//!     ..Default::default()
//! };
//!
//! let results = backend.search(params).await?;
//! println!("Found {} results", results.total);
//! ```

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{Months, NaiveDateTime, TimeDelta};
use quarry_core::{Record, RecordType, Result};
use serde::{Deserialize, Serialize};

use crate::index::SearchIndex;
use crate::prepare::Document;

/// Document field holding the identity `<app>.<model>.<pk>`.
pub const ID_FIELD: &str = "id";

/// Document field holding the record type tag `<app>.<model>`.
pub const RECORD_TYPE_FIELD: &str = "record_type";

/// Document field holding the primary key.
pub const RECORD_ID_FIELD: &str = "record_id";

/// Document identity for a record type and primary key.
pub fn document_id(record_type: &RecordType, pk: &str) -> String {
    format!("{}.{}", record_type.tag(), pk)
}

/// Calendar unit of a date facet gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapUnit {
    /// Calendar years.
    Year,
    /// Calendar months.
    Month,
    /// Days.
    Day,
    /// Hours.
    Hour,
    /// Minutes.
    Minute,
    /// Seconds.
    Second,
}

/// Bucket width of a date facet, e.g. one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateGap {
    /// Unit.
    pub unit: GapUnit,
    /// Number of units per bucket.
    pub amount: u32,
}

impl DateGap {
    /// A gap of `amount` units.
    pub fn new(unit: GapUnit, amount: u32) -> Self {
        Self { unit, amount }
    }

    /// Advance `from` by one gap. `None` on overflow or a zero gap.
    pub fn advance(&self, from: NaiveDateTime) -> Option<NaiveDateTime> {
        if self.amount == 0 {
            return None;
        }
        let amount = i64::from(self.amount);
        match self.unit {
            GapUnit::Year => from.checked_add_months(Months::new(self.amount.checked_mul(12)?)),
            GapUnit::Month => from.checked_add_months(Months::new(self.amount)),
            GapUnit::Day => from.checked_add_signed(TimeDelta::try_days(amount)?),
            GapUnit::Hour => from.checked_add_signed(TimeDelta::try_hours(amount)?),
            GapUnit::Minute => from.checked_add_signed(TimeDelta::try_minutes(amount)?),
            GapUnit::Second => from.checked_add_signed(TimeDelta::try_seconds(amount)?),
        }
    }
}

/// A date facet request: count documents per gap between two dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateFacet {
    /// First bucket start (inclusive).
    pub start: NaiveDateTime,
    /// Last bucket end (exclusive).
    pub end: NaiveDateTime,
    /// Bucket width.
    pub gap: DateGap,
}

/// A query facet request: count documents whose `field` matches `query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFacet {
    /// Field to test.
    pub field: String,
    /// Text the field must contain.
    pub query: String,
}

impl QueryFacet {
    /// Key of this facet in [`Facets::queries`]: `<field>:<query>`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.field, self.query)
    }
}

/// Parameters for a search request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchParams {
    /// Search query string. An empty query returns no results.
    pub query: String,

    /// Return highlighted document text with each hit.
    #[serde(default)]
    pub highlight: bool,

    /// Fields to compute value counts for.
    #[serde(default)]
    pub facets: Vec<String>,

    /// Date facets by field name.
    #[serde(default)]
    pub date_facets: BTreeMap<String, DateFacet>,

    /// Query facets.
    #[serde(default)]
    pub query_facets: Vec<QueryFacet>,

    /// Narrowing filters, each `<field>:<value>`.
    #[serde(default)]
    pub narrow_queries: Vec<String>,

    /// Restrict results to these record types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_types: Option<Vec<RecordType>>,

    /// Index of the first hit to return.
    #[serde(default)]
    pub start_offset: usize,

    /// Index one past the last hit to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_offset: Option<usize>,
}

/// A single search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Document identity.
    pub id: String,

    /// Record type of the hit.
    pub record_type: RecordType,

    /// Primary key of the hit.
    pub pk: String,

    /// Relevance score (higher is better).
    pub score: f32,

    /// Stored fields.
    pub fields: Document,

    /// Highlighted document text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted: Option<Vec<String>>,
}

/// Facet counts for a search.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Facets {
    /// Value counts per field, highest count first.
    pub fields: BTreeMap<String, Vec<(String, usize)>>,

    /// Bucket counts per date field, in bucket order.
    pub dates: BTreeMap<String, Vec<(NaiveDateTime, usize)>>,

    /// Match counts per query facet key.
    pub queries: BTreeMap<String, usize>,
}

impl Facets {
    /// Whether no facet was computed.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.dates.is_empty() && self.queries.is_empty()
    }
}

/// Collection of search results.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    /// Hits in the requested page.
    pub items: Vec<SearchHit>,

    /// Total number of matching documents (may be > items.len() if paged).
    pub total: usize,

    /// Facet counts over all matching documents.
    pub facets: Facets,

    /// Backend that executed the search.
    pub backend: String,
}

impl SearchResults {
    /// Create empty results.
    pub fn empty(backend: &str) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            facets: Facets::default(),
            backend: backend.to_string(),
        }
    }
}

/// Abstract search backend trait.
///
/// A backend receives records together with the index that owns them and
/// prepares each one through [`SearchIndex::full_prepare`]; it never looks at
/// record attributes itself. Documents are keyed by [`document_id`].
///
/// Backend failures surface as [`quarry_core::BackendError`]; preparation
/// failures propagate unchanged.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Prepare and index `records`, replacing documents with the same
    /// identity.
    async fn update(&self, index: &SearchIndex, records: &[Record]) -> Result<()>;

    /// Delete the document of `record`.
    async fn remove(&self, record: &Record) -> Result<()>;

    /// Delete every document, or only those of the given record types.
    async fn clear(&self, record_types: Option<&[RecordType]>) -> Result<()>;

    /// Execute a search.
    async fn search(&self, params: SearchParams) -> Result<SearchResults>;

    /// Get the backend name for diagnostics.
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================
