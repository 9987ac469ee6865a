//! Document preparation.
//!
//! [`DocumentPreparer`] turns one record into a flat [`Document`]. Fields are
//! processed in schema order, and each is handled in one of three ways:
//!
//! - a translatable base field aggregates its per-locale values: the record
//!   is re-fetched in every configured locale and each value is appended as
//!   `" " + value`;
//! - a derived `<base>__<code>` field re-fetches the record in its locale
//!   and extracts with the base field's hook or the default extraction;
//! - any other field extracts from the record as given.
//!
//! The locale is passed explicitly to every fetch and extraction, so a
//! locale used for one field never affects the next one.

use std::collections::BTreeMap;

use quarry_core::{Locale, Record, Result, Value};

use crate::extract::{DefaultExtractor, ExtractContext, Extractor};
use crate::field::FieldDescriptor;
use crate::schema::IndexDefinition;
use crate::source::RecordSource;
use crate::template::TemplateRenderer;

/// A prepared document: field name to value.
pub type Document = BTreeMap<String, Value>;

/// Prepares documents for one index definition.
#[derive(Clone, Copy)]
pub struct DocumentPreparer<'a> {
    definition: &'a IndexDefinition,
    source: &'a dyn RecordSource,
    templates: &'a dyn TemplateRenderer,
}

impl std::fmt::Debug for DocumentPreparer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentPreparer")
            .field("definition", &self.definition.name())
            .field("record_type", self.source.record_type())
            .finish_non_exhaustive()
    }
}

impl<'a> DocumentPreparer<'a> {
    /// Create a preparer.
    pub fn new(
        definition: &'a IndexDefinition,
        source: &'a dyn RecordSource,
        templates: &'a dyn TemplateRenderer,
    ) -> Self {
        Self {
            definition,
            source,
            templates,
        }
    }

    /// Prepare every schema field of `record`.
    ///
    /// # Errors
    ///
    /// The first extraction or source error aborts preparation.
    pub async fn prepare(&self, record: &Record) -> Result<Document> {
        let schema = self.definition.schema();
        let mut document = Document::new();

        for field in schema.fields() {
            let value = match field.locale() {
                Some(locale) => {
                    let localized = self.refetch(record, locale).await?;
                    self.extract(field.base_name(), &localized, field, Some(locale))?
                }
                None if schema.is_translatable(field.name()) => {
                    self.aggregate(record, field).await?
                }
                None => self.extract(field.name(), record, field, None)?,
            };
            document.insert(field.name().to_string(), value);
        }

        log::debug!(
            "Prepared {} with {} fields for '{}'",
            record.identity(),
            document.len(),
            self.definition.name()
        );
        Ok(document)
    }

    async fn aggregate(&self, record: &Record, field: &FieldDescriptor) -> Result<Value> {
        let mut text = String::new();
        for locale in self.definition.schema().locales() {
            let localized = self.refetch(record, locale).await?;
            let value = self.extract(field.name(), &localized, field, Some(locale))?;
            text.push(' ');
            text.push_str(&value.to_text());
        }
        Ok(Value::Text(text))
    }

    async fn refetch(&self, record: &Record, locale: &Locale) -> Result<Record> {
        log::debug!("Re-fetching {} in locale '{}'", record.identity(), locale);
        self.source.fetch(record.pk(), Some(locale)).await
    }

    fn extract(
        &self,
        base: &str,
        record: &Record,
        field: &FieldDescriptor,
        locale: Option<&Locale>,
    ) -> Result<Value> {
        let ctx = ExtractContext {
            record,
            field,
            locale,
            templates: self.templates,
        };
        let value = match self.definition.hook(base) {
            Some(hook) => hook.extract(&ctx)?,
            None => DefaultExtractor.extract(&ctx)?,
        };
        Ok(value)
    }
}

// ============================================================================
// Tests
// ============================================================================
