//! Search indexes.
//!
//! A [`SearchIndex`] binds an [`IndexDefinition`] to a record source and a
//! backend, and drives the index lifecycle: full updates, single-record
//! updates and removals, clearing and reindexing.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use quarry_index::{IndexDefinition, MemoryBackend, MemorySource, SearchIndex};
//!
//! let index = SearchIndex::new(definition, Arc::new(source), Arc::new(MemoryBackend::default()))?;
//! index.reindex().await?;
//! ```

use std::fmt;
use std::slice;
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use quarry_core::{Record, RecordType, Result, Value};

use crate::backend::{ID_FIELD, RECORD_ID_FIELD, RECORD_TYPE_FIELD, SearchBackend, document_id};
use crate::prepare::{Document, DocumentPreparer};
use crate::schema::{IndexDefinition, Schema};
use crate::source::RecordSource;
use crate::template::{TemplateRenderer, TemplateStore};

/// A change in the storage layer, delivered by the application.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// The record was created or modified.
    Saved(Record),
    /// The record was deleted.
    Deleted(Record),
}

impl ChangeEvent {
    /// The record the event is about.
    pub fn record(&self) -> &Record {
        match self {
            ChangeEvent::Saved(record) | ChangeEvent::Deleted(record) => record,
        }
    }
}

/// An index definition bound to a record source and a backend.
pub struct SearchIndex {
    definition: IndexDefinition,
    document_field: String,
    source: Arc<dyn RecordSource>,
    backend: Arc<dyn SearchBackend>,
    templates: Arc<dyn TemplateRenderer>,
    last_prepared: Mutex<Option<Document>>,
}

impl fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchIndex")
            .field("definition", &self.definition.name())
            .field("record_type", self.source.record_type())
            .field("document_field", &self.document_field)
            .field("backend", &self.backend.name())
            .finish_non_exhaustive()
    }
}

impl SearchIndex {
    /// Bind `definition` to `source` and `backend`.
    ///
    /// Templates are rendered by an empty [`TemplateStore`] until
    /// [`with_templates`](Self::with_templates) is called.
    ///
    /// # Errors
    ///
    /// Returns [`quarry_core::SchemaError::DocumentFieldCount`] unless the
    /// schema has exactly one document field.
    pub fn new(
        definition: IndexDefinition,
        source: Arc<dyn RecordSource>,
        backend: Arc<dyn SearchBackend>,
    ) -> Result<Self> {
        let document_field = definition.schema().document_field()?.name().to_string();
        Ok(Self {
            definition,
            document_field,
            source,
            backend,
            templates: Arc::new(TemplateStore::new()),
            last_prepared: Mutex::new(None),
        })
    }

    /// Use `templates` to render templated fields.
    pub fn with_templates(mut self, templates: Arc<dyn TemplateRenderer>) -> Self {
        self.templates = templates;
        self
    }

    /// The index definition.
    pub fn definition(&self) -> &IndexDefinition {
        &self.definition
    }

    /// The shared schema.
    pub fn schema(&self) -> &Arc<Schema> {
        self.definition.schema()
    }

    /// Record type this index covers.
    pub fn record_type(&self) -> &RecordType {
        self.source.record_type()
    }

    /// The record source.
    pub fn source(&self) -> &Arc<dyn RecordSource> {
        &self.source
    }

    /// The backend.
    pub fn backend(&self) -> &Arc<dyn SearchBackend> {
        &self.backend
    }

    /// Name of the document field.
    pub fn document_field_name(&self) -> &str {
        &self.document_field
    }

    /// Attribute holding each record's last-modified timestamp, if any.
    pub fn updated_field_name(&self) -> Option<&str> {
        self.definition.updated_field_name()
    }

    // ------------------------------------------------------------------------
    // Preparation
    // ------------------------------------------------------------------------

    /// Prepare the schema fields of `record`.
    pub async fn prepare(&self, record: &Record) -> Result<Document> {
        let preparer =
            DocumentPreparer::new(&self.definition, self.source.as_ref(), self.templates.as_ref());
        let document = preparer.prepare(record).await?;
        match self.last_prepared.lock() {
            Ok(mut slot) => *slot = Some(document.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(document.clone()),
        }
        Ok(document)
    }

    /// Prepare `record` and add the identity fields `id`, `record_type` and
    /// `record_id`.
    pub async fn full_prepare(&self, record: &Record) -> Result<Document> {
        let mut document = self.prepare(record).await?;
        document.insert(
            ID_FIELD.to_string(),
            Value::Text(document_id(record.record_type(), record.pk())),
        );
        document.insert(
            RECORD_TYPE_FIELD.to_string(),
            Value::Text(record.record_type().tag()),
        );
        document.insert(
            RECORD_ID_FIELD.to_string(),
            Value::Text(record.pk().to_string()),
        );
        Ok(document)
    }

    /// The most recently prepared document (without identity fields).
    pub fn last_prepared(&self) -> Option<Document> {
        match self.last_prepared.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    // ------------------------------------------------------------------------
    // Record selection
    // ------------------------------------------------------------------------

    /// Records included in a full rebuild.
    pub async fn record_source(&self) -> Result<Vec<Record>> {
        let records = self.source.all(None).await?;
        Ok(records
            .into_iter()
            .filter(|r| self.definition.includes(r))
            .collect())
    }

    /// Records search results are loaded back from.
    pub async fn load_all_records(&self) -> Result<Vec<Record>> {
        self.source.all(None).await
    }

    /// Records changed at or after `since`, or every rebuild record when the
    /// definition has no updated field.
    pub async fn records_updated_since(&self, since: NaiveDateTime) -> Result<Vec<Record>> {
        match self.updated_field_name() {
            Some(field) => {
                let records = self.source.updated_since(field, since, None).await?;
                Ok(records
                    .into_iter()
                    .filter(|r| self.definition.includes(r))
                    .collect())
            }
            None => self.record_source().await,
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Prepare and push every record of [`record_source`](Self::record_source)
    /// in one backend call.
    pub async fn update(&self) -> Result<()> {
        let records = self.record_source().await?;
        self.backend.update(self, &records).await?;
        log::info!(
            "Updated {} {} records in '{}'",
            records.len(),
            self.record_type(),
            self.backend.name()
        );
        Ok(())
    }

    /// Push one record unless the definition's `should_update` hook declines.
    ///
    /// Returns whether the record was pushed.
    pub async fn update_one(&self, record: &Record) -> Result<bool> {
        if !self.definition.should_update(record) {
            log::debug!("Skipping update of {}", record.identity());
            return Ok(false);
        }
        self.backend.update(self, slice::from_ref(record)).await?;
        Ok(true)
    }

    /// Delete the document of `record`.
    pub async fn remove_one(&self, record: &Record) -> Result<()> {
        self.backend.remove(record).await
    }

    /// Delete every document of this record type.
    pub async fn clear(&self) -> Result<()> {
        self.backend
            .clear(Some(slice::from_ref(self.record_type())))
            .await?;
        log::info!(
            "Cleared {} documents from '{}'",
            self.record_type(),
            self.backend.name()
        );
        Ok(())
    }

    /// [`clear`](Self::clear), then [`update`](Self::update). Not atomic.
    pub async fn reindex(&self) -> Result<()> {
        log::info!("Reindexing {}", self.record_type());
        self.clear().await?;
        self.update().await
    }

    /// React to a storage change.
    pub async fn handle_change(&self, event: &ChangeEvent) -> Result<()> {
        match event {
            ChangeEvent::Saved(record) => self.update_one(record).await.map(|_| ()),
            ChangeEvent::Deleted(record) => self.remove_one(record).await,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
