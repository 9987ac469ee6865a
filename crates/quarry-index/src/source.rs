//! Record sources.
//!
//! A [`RecordSource`] is the storage layer seen from the index: it lists the
//! records of one type, fetches a record by primary key, and selects records
//! changed since a timestamp. Every call takes an explicit locale; a source
//! that stores translations returns the record's attributes in that locale.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use quarry_core::{Locale, Record, RecordType, Result, SourceError, Value};
use tokio::sync::{Mutex, RwLock};

use crate::field::FieldKind;

/// Read access to the records an index covers.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Type of the records this source yields.
    fn record_type(&self) -> &RecordType;

    /// Every record, in the source's natural order.
    async fn all(&self, locale: Option<&Locale>) -> Result<Vec<Record>>;

    /// One record by primary key.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NotFound`] if no record has this key.
    async fn fetch(&self, pk: &str, locale: Option<&Locale>) -> Result<Record>;

    /// Records whose `field` attribute is at or after `since`.
    async fn updated_since(
        &self,
        field: &str,
        since: NaiveDateTime,
        locale: Option<&Locale>,
    ) -> Result<Vec<Record>>;
}

/// A record source held in memory.
///
/// Translations are stored as per-locale attribute overlays: fetching a
/// record in a locale returns the base attributes with that locale's
/// overlay applied. Every `fetch` is logged so that callers can observe the
/// re-fetch pattern of translatable fields.
#[derive(Debug)]
pub struct MemorySource {
    record_type: RecordType,
    records: RwLock<Vec<Record>>,
    translations: RwLock<HashMap<(String, Locale), Vec<(String, Value)>>>,
    fetches: Mutex<Vec<(String, Option<Locale>)>>,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new(record_type: RecordType) -> Self {
        Self::with_records(record_type, Vec::new())
    }

    /// Create a source holding `records`.
    pub fn with_records(record_type: RecordType, records: Vec<Record>) -> Self {
        Self {
            record_type,
            records: RwLock::new(records),
            translations: RwLock::new(HashMap::new()),
            fetches: Mutex::new(Vec::new()),
        }
    }

    /// Insert a record, replacing one with the same primary key.
    pub async fn insert(&self, record: Record) {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.pk() == record.pk()) {
            Some(slot) => *slot = record,
            None => records.push(record),
        }
    }

    /// Remove a record and its translations.
    pub async fn remove(&self, pk: &str) -> Option<Record> {
        self.translations.write().await.retain(|(key, _), _| key != pk);
        let mut records = self.records.write().await;
        let position = records.iter().position(|r| r.pk() == pk)?;
        Some(records.remove(position))
    }

    /// Set an attribute of record `pk` as seen in `locale`.
    pub async fn translate(
        &self,
        pk: impl Into<String>,
        locale: impl Into<Locale>,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) {
        let name = name.into();
        let value = value.into();
        let mut translations = self.translations.write().await;
        let overlay = translations.entry((pk.into(), locale.into())).or_default();
        match overlay.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => overlay.push((name, value)),
        }
    }

    /// Number of records held.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the source is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// `(pk, locale)` of every `fetch` call so far, in call order.
    pub async fn fetch_log(&self) -> Vec<(String, Option<Locale>)> {
        self.fetches.lock().await.clone()
    }

    async fn localize(&self, record: &Record, locale: Option<&Locale>) -> Record {
        let mut record = record.clone();
        if let Some(locale) = locale {
            let translations = self.translations.read().await;
            if let Some(overlay) = translations.get(&(record.pk().to_string(), locale.clone())) {
                for (name, value) in overlay {
                    record.set(name.clone(), value.clone());
                }
            }
        }
        record
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    async fn all(&self, locale: Option<&Locale>) -> Result<Vec<Record>> {
        let records = self.records.read().await.clone();
        let mut out = Vec::with_capacity(records.len());
        for record in &records {
            out.push(self.localize(record, locale).await);
        }
        Ok(out)
    }

    async fn fetch(&self, pk: &str, locale: Option<&Locale>) -> Result<Record> {
        self.fetches
            .lock()
            .await
            .push((pk.to_string(), locale.cloned()));
        let record = self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.pk() == pk)
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                record_type: self.record_type.tag(),
                pk: pk.to_string(),
            })?;
        Ok(self.localize(&record, locale).await)
    }

    async fn updated_since(
        &self,
        field: &str,
        since: NaiveDateTime,
        locale: Option<&Locale>,
    ) -> Result<Vec<Record>> {
        let mut out = Vec::new();
        for record in self.all(locale).await? {
            let Some(value) = record.attribute(field) else {
                continue;
            };
            let stamp = FieldKind::DateTime.convert(field, value).map_err(|e| {
                SourceError::UnsupportedFilter {
                    field: field.to_string(),
                    message: e.to_string(),
                }
            })?;
            if let Value::DateTime(stamp) = stamp
                && stamp >= since
            {
                out.push(record);
            }
        }
        Ok(out)
    }
}

// ============================================================================
// Tests
// ============================================================================
