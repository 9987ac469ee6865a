//! Index registry.
//!
//! The `IndexRegistry` holds at most one [`SearchIndex`] per record type and
//! routes storage change events to the right index. Applications wire their
//! save/delete notifications to [`IndexRegistry::dispatch`].

use std::collections::BTreeMap;
use std::sync::Arc;

use quarry_core::{Error, RecordType, Result};

use crate::index::{ChangeEvent, SearchIndex};

/// Registered indexes by record type.
#[derive(Debug, Default)]
pub struct IndexRegistry {
    indexes: BTreeMap<RecordType, Arc<SearchIndex>>,
}

impl IndexRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `index` for its record type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRegistered`] if the type already has an index.
    pub fn register(&mut self, index: Arc<SearchIndex>) -> Result<()> {
        let record_type = index.record_type().clone();
        if self.indexes.contains_key(&record_type) {
            return Err(Error::AlreadyRegistered {
                record_type: record_type.tag(),
            });
        }
        log::debug!(
            "Registered '{}' for {record_type}",
            index.definition().name()
        );
        self.indexes.insert(record_type, index);
        Ok(())
    }

    /// Remove and return the index of `record_type`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRegistered`] if the type has no index.
    pub fn unregister(&mut self, record_type: &RecordType) -> Result<Arc<SearchIndex>> {
        self.indexes
            .remove(record_type)
            .ok_or_else(|| not_registered(record_type))
    }

    /// The index of `record_type`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRegistered`] if the type has no index.
    pub fn get(&self, record_type: &RecordType) -> Result<&Arc<SearchIndex>> {
        self.indexes
            .get(record_type)
            .ok_or_else(|| not_registered(record_type))
    }

    /// Whether `record_type` has an index.
    pub fn is_registered(&self, record_type: &RecordType) -> bool {
        self.indexes.contains_key(record_type)
    }

    /// Indexed record types, sorted.
    pub fn indexed_types(&self) -> Vec<&RecordType> {
        self.indexes.keys().collect()
    }

    /// Every registered index, sorted by record type.
    pub fn indexes(&self) -> impl Iterator<Item = &Arc<SearchIndex>> {
        self.indexes.values()
    }

    /// Number of registered indexes.
    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    /// Whether no index is registered.
    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// The union of field names across all indexes, sorted.
    pub fn all_field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .indexes
            .values()
            .flat_map(|index| index.schema().field_names().map(str::to_string))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Route a change event to the index of its record type.
    ///
    /// Returns whether an index handled the event; events for unregistered
    /// types are ignored.
    pub async fn dispatch(&self, event: &ChangeEvent) -> Result<bool> {
        let record_type = event.record().record_type();
        match self.indexes.get(record_type) {
            Some(index) => {
                index.handle_change(event).await?;
                Ok(true)
            }
            None => {
                log::debug!("No index for {record_type}, ignoring change event");
                Ok(false)
            }
        }
    }
}

fn not_registered(record_type: &RecordType) -> Error {
    Error::NotRegistered {
        record_type: record_type.tag(),
    }
}

// ============================================================================
// Tests
// ============================================================================
