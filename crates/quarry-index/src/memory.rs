//! In-memory search backend.
//!
//! `MemoryBackend` keeps prepared documents in a map keyed by document
//! identity and answers searches with a linear scan. It implements the full
//! backend contract (highlighting, facets, narrowing, pagination) and is
//! intended for tests and small collections.
//!
//! # Matching
//!
//! The query is split on whitespace; a document matches when its document
//! field contains every term, case-insensitively. `*` matches everything.
//! The score is the number of term occurrences.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use quarry_core::{BackendError, Record, RecordType, Result, Settings, Value};
use tokio::sync::RwLock;

use crate::backend::{
    DateFacet, Facets, SearchBackend, SearchHit, SearchParams, SearchResults, document_id,
};
use crate::index::SearchIndex;
use crate::prepare::Document;

const NAME: &str = "memory";

/// Upper bound on the buckets one date facet may produce.
pub const MAX_DATE_BUCKETS: usize = 1000;

/// A document held by [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Record type of the source record.
    pub record_type: RecordType,
    /// Primary key of the source record.
    pub pk: String,
    /// Name of the document field.
    pub document_field: String,
    /// Prepared fields, identity fields included.
    pub fields: Document,
}

impl StoredDocument {
    fn text(&self) -> String {
        self.fields
            .get(&self.document_field)
            .map(Value::to_text)
            .unwrap_or_default()
    }
}

/// In-process search backend.
#[derive(Debug)]
pub struct MemoryBackend {
    batch_size: usize,
    documents: RwLock<BTreeMap<String, StoredDocument>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

impl MemoryBackend {
    /// Create an empty backend using the configured batch size.
    pub fn new(settings: &Settings) -> Self {
        Self {
            batch_size: settings.batch_size.max(1),
            documents: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether no documents are stored.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// A stored document by identity.
    pub async fn document(&self, id: &str) -> Option<StoredDocument> {
        self.documents.read().await.get(id).cloned()
    }

    /// Number of stored documents of `record_type`.
    pub async fn count(&self, record_type: &RecordType) -> usize {
        self.documents
            .read()
            .await
            .values()
            .filter(|d| &d.record_type == record_type)
            .count()
    }
}

#[async_trait]
impl SearchBackend for MemoryBackend {
    async fn update(&self, index: &SearchIndex, records: &[Record]) -> Result<()> {
        let document_field = index.document_field_name().to_string();

        for chunk in records.chunks(self.batch_size) {
            let mut prepared = Vec::with_capacity(chunk.len());
            let mut failure = None;
            for record in chunk {
                match index.full_prepare(record).await {
                    Ok(fields) => prepared.push((record, fields)),
                    Err(e) => {
                        log::warn!("Stopping update at {}: {e}", record.identity());
                        failure = Some(e);
                        break;
                    }
                }
            }

            let mut documents = self.documents.write().await;
            for (record, fields) in prepared {
                documents.insert(
                    document_id(record.record_type(), record.pk()),
                    StoredDocument {
                        record_type: record.record_type().clone(),
                        pk: record.pk().to_string(),
                        document_field: document_field.clone(),
                        fields,
                    },
                );
            }
            drop(documents);

            if let Some(e) = failure {
                return Err(e);
            }
        }

        log::debug!("{NAME}: indexed {} records", records.len());
        Ok(())
    }

    async fn remove(&self, record: &Record) -> Result<()> {
        let id = document_id(record.record_type(), record.pk());
        if self.documents.write().await.remove(&id).is_some() {
            log::debug!("{NAME}: removed {id}");
        }
        Ok(())
    }

    async fn clear(&self, record_types: Option<&[RecordType]>) -> Result<()> {
        let mut documents = self.documents.write().await;
        let before = documents.len();
        match record_types {
            None => documents.clear(),
            Some(types) => documents.retain(|_, d| !types.contains(&d.record_type)),
        }
        log::info!("{NAME}: cleared {} documents", before - documents.len());
        Ok(())
    }

    async fn search(&self, params: SearchParams) -> Result<SearchResults> {
        let query = params.query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(SearchResults::empty(NAME));
        }
        let terms: Vec<&str> = if query == "*" {
            Vec::new()
        } else {
            query.split_whitespace().collect()
        };
        let narrows = parse_narrow_queries(&params)?;

        let documents = self.documents.read().await;
        let mut matches: Vec<(&String, &StoredDocument, f32)> = documents
            .iter()
            .filter(|(_, d)| {
                params
                    .record_types
                    .as_ref()
                    .is_none_or(|types| types.contains(&d.record_type))
            })
            .filter(|(_, d)| narrows.iter().all(|(f, v)| field_equals(&d.fields, f, v)))
            .filter_map(|(id, d)| score(&d.text(), &terms).map(|s| (id, d, s)))
            .collect();
        matches.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| a.0.cmp(b.0)));

        let facets = compute_facets(&params, matches.iter().map(|(_, d, _)| *d))?;
        let total = matches.len();
        let end = params.end_offset.unwrap_or(total).min(total);
        let start = params.start_offset.min(end);

        let items = matches[start..end]
            .iter()
            .map(|(id, d, score)| SearchHit {
                id: (*id).clone(),
                record_type: d.record_type.clone(),
                pk: d.pk.clone(),
                score: *score,
                fields: d.fields.clone(),
                highlighted: params.highlight.then(|| vec![highlight(&d.text(), &terms)]),
            })
            .collect();

        log::debug!(
            "{NAME}: query='{}' matched {total}, returning {start}..{end}",
            params.query
        );
        Ok(SearchResults {
            items,
            total,
            facets,
            backend: NAME.to_string(),
        })
    }

    fn name(&self) -> &str {
        NAME
    }
}

fn parse_narrow_queries(params: &SearchParams) -> Result<Vec<(String, String)>> {
    params
        .narrow_queries
        .iter()
        .map(|narrow| match narrow.split_once(':') {
            Some((field, value)) if !field.trim().is_empty() => {
                Ok((field.trim().to_string(), value.trim().to_lowercase()))
            }
            _ => Err(BackendError::InvalidQuery {
                backend: NAME.to_string(),
                query: narrow.clone(),
                message: "narrow queries must look like 'field:value'".to_string(),
            }
            .into()),
        })
        .collect()
}

fn field_equals(fields: &Document, field: &str, value: &str) -> bool {
    match fields.get(field) {
        Some(Value::List(items)) => items.iter().any(|v| v.to_text().to_lowercase() == value),
        Some(v) => v.to_text().to_lowercase() == value,
        None => false,
    }
}

/// Occurrence count of all terms, or `None` if any term is absent.
fn score(text: &str, terms: &[&str]) -> Option<f32> {
    if terms.is_empty() {
        return Some(1.0);
    }
    let text = text.to_lowercase();
    let mut total = 0usize;
    for term in terms {
        let count = text.matches(term).count();
        if count == 0 {
            return None;
        }
        total += count;
    }
    Some(total as f32)
}

/// Wrap every word containing a term in `<em>` tags.
fn highlight(text: &str, terms: &[&str]) -> String {
    text.split(' ')
        .map(|word| {
            let lower = word.to_lowercase();
            if !terms.is_empty() && terms.iter().any(|t| lower.contains(t)) {
                format!("<em>{word}</em>")
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn compute_facets<'a>(
    params: &SearchParams,
    documents: impl Iterator<Item = &'a StoredDocument> + Clone,
) -> Result<Facets> {
    let mut facets = Facets::default();

    for field in &params.facets {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for doc in documents.clone() {
            match doc.fields.get(field) {
                Some(Value::List(items)) => {
                    for item in items {
                        *counts.entry(item.to_text()).or_default() += 1;
                    }
                }
                Some(Value::Null) | None => {}
                Some(value) => *counts.entry(value.to_text()).or_default() += 1,
            }
        }
        let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        facets.fields.insert(field.clone(), counts);
    }

    for (field, facet) in &params.date_facets {
        let mut stamps: Vec<NaiveDateTime> = documents
            .clone()
            .filter_map(|doc| as_datetime(doc.fields.get(field)?))
            .collect();
        stamps.sort_unstable();
        let buckets = date_buckets(field, facet, &stamps)?;
        facets.dates.insert(field.clone(), buckets);
    }

    for facet in &params.query_facets {
        let query = facet.query.to_lowercase();
        let count = documents
            .clone()
            .filter(|doc| {
                doc.fields
                    .get(&facet.field)
                    .is_some_and(|v| v.to_text().to_lowercase().contains(&query))
            })
            .count();
        facets.queries.insert(facet.key(), count);
    }

    Ok(facets)
}

fn as_datetime(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::Date(d) => d.and_hms_opt(0, 0, 0),
        _ => None,
    }
}

/// Count `stamps` (sorted) per gap between the facet bounds.
fn date_buckets(
    field: &str,
    facet: &DateFacet,
    stamps: &[NaiveDateTime],
) -> std::result::Result<Vec<(NaiveDateTime, usize)>, BackendError> {
    let mut buckets = Vec::new();
    let mut start = facet.start;
    while start < facet.end {
        if buckets.len() == MAX_DATE_BUCKETS {
            return Err(BackendError::InvalidQuery {
                backend: NAME.to_string(),
                query: format!("{field}: {} to {}", facet.start, facet.end),
                message: format!("date facet exceeds {MAX_DATE_BUCKETS} buckets"),
            });
        }
        let Some(next) = facet.gap.advance(start) else {
            break;
        };
        let end = next.min(facet.end);
        let from = stamps.partition_point(|s| *s < start);
        let to = stamps.partition_point(|s| *s < end);
        buckets.push((start, to - from));
        start = next;
    }
    Ok(buckets)
}

// ============================================================================
// Tests
// ============================================================================
