//! Index definitions and the schemas they build.
//!
//! An [`IndexDefinition`] is assembled once with
//! [`IndexDefinition::builder`] and is immutable afterwards. Building it:
//!
//! 1. merges the fields of every extended definition, farthest ancestor
//!    first, so that nearer definitions override on name collisions;
//! 2. adds the directly declared fields (again overriding by name);
//! 3. expands every translatable field into one `<name>__<code>` field per
//!    configured locale.
//!
//! Override hooks, record filters and the `updated_field` are inherited the
//! same way.
//!
//! ```rust
//! use quarry_core::Settings;
//! use quarry_index::{FieldDescriptor, IndexDefinition};
//!
//! let settings = Settings::with_languages(["en", "fr"]);
//! let definition = IndexDefinition::builder("NoteIndex")
//!     .field("text", FieldDescriptor::text().document().use_template())
//!     .field("author", FieldDescriptor::text().model_attr("user.name"))
//!     .translatable(["text"])
//!     .build(&settings)
//!     .unwrap();
//!
//! let names: Vec<&str> = definition.schema().field_names().collect();
//! assert_eq!(names, ["text", "author", "text__en", "text__fr"]);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use quarry_core::{
    ExtractionError, LOCALE_SEPARATOR, Locale, Record, SchemaError, Settings, Value,
};

use crate::backend::{ID_FIELD, RECORD_ID_FIELD, RECORD_TYPE_FIELD};
use crate::extract::{CustomExtractor, ExtractContext, Extractor};
use crate::field::FieldDescriptor;

/// Field names added to every document by the index; not declarable.
pub const RESERVED_FIELD_NAMES: [&str; 3] = [ID_FIELD, RECORD_TYPE_FIELD, RECORD_ID_FIELD];

/// Predicate over records.
pub type RecordPredicate = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

/// The expanded, immutable field map of an index definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    fields: Vec<FieldDescriptor>,
    translatable: Vec<String>,
    locales: Vec<Locale>,
}

impl Schema {
    /// Name of the definition that built this schema.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All fields in schema order: inherited and declared fields first,
    /// then the derived per-locale fields.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Field names in schema order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(FieldDescriptor::name)
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Number of fields, derived ones included.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Base names of the translatable fields.
    pub fn translatable(&self) -> &[String] {
        &self.translatable
    }

    /// Whether `name` is a translatable base field.
    pub fn is_translatable(&self, name: &str) -> bool {
        self.translatable.iter().any(|t| t == name)
    }

    /// Locales the translatable fields were expanded for, in order.
    pub fn locales(&self) -> &[Locale] {
        &self.locales
    }

    /// Fields flagged as the document field.
    pub fn document_fields(&self) -> Vec<&FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_document()).collect()
    }

    /// The single document field.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DocumentFieldCount`] unless exactly one field
    /// is flagged.
    pub fn document_field(&self) -> Result<&FieldDescriptor, SchemaError> {
        match self.document_fields().as_slice() {
            [field] => Ok(*field),
            fields => Err(SchemaError::DocumentFieldCount {
                index: self.name.clone(),
                count: fields.len(),
                fields: fields.iter().map(|f| f.name().to_string()).collect(),
            }),
        }
    }
}

/// A built index definition: schema plus per-field hooks and record
/// selection hooks. Cheap to clone.
#[derive(Clone)]
pub struct IndexDefinition {
    schema: Arc<Schema>,
    hooks: HashMap<String, Arc<dyn Extractor>>,
    filter: Option<RecordPredicate>,
    should_update: Option<RecordPredicate>,
    updated_field: Option<String>,
}

impl fmt::Debug for IndexDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut hooks: Vec<&String> = self.hooks.keys().collect();
        hooks.sort();
        f.debug_struct("IndexDefinition")
            .field("schema", &self.schema)
            .field("hooks", &hooks)
            .field("filter", &self.filter.is_some())
            .field("should_update", &self.should_update.is_some())
            .field("updated_field", &self.updated_field)
            .finish()
    }
}

impl IndexDefinition {
    /// Start a definition named `name`.
    pub fn builder(name: impl Into<String>) -> IndexDefinitionBuilder {
        IndexDefinitionBuilder::new(name)
    }

    /// The ready-made definition with a single templated document field,
    /// `text`.
    pub fn basic(settings: &Settings) -> Result<Self, SchemaError> {
        Self::builder("BasicSearchIndex")
            .field("text", FieldDescriptor::text().document().use_template())
            .build(settings)
    }

    /// Definition name.
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// The built schema, shared by every index of this definition.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Override hook registered for a base field name.
    pub fn hook(&self, base_name: &str) -> Option<&Arc<dyn Extractor>> {
        self.hooks.get(base_name)
    }

    /// Whether `record` belongs in a full rebuild.
    pub fn includes(&self, record: &Record) -> bool {
        self.filter.as_ref().is_none_or(|f| f(record))
    }

    /// Whether a change to `record` should be pushed to the backend.
    pub fn should_update(&self, record: &Record) -> bool {
        self.should_update.as_ref().is_none_or(|f| f(record))
    }

    /// Attribute holding each record's last-modified timestamp, if any.
    pub fn updated_field_name(&self) -> Option<&str> {
        self.updated_field.as_deref()
    }
}

/// Builder for [`IndexDefinition`].
#[must_use]
pub struct IndexDefinitionBuilder {
    name: String,
    parents: Vec<IndexDefinition>,
    fields: Vec<(String, FieldDescriptor)>,
    translatable: Vec<String>,
    hooks: Vec<(String, Arc<dyn Extractor>)>,
    filter: Option<RecordPredicate>,
    should_update: Option<RecordPredicate>,
    updated_field: Option<String>,
}

impl IndexDefinitionBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parents: Vec::new(),
            fields: Vec::new(),
            translatable: Vec::new(),
            hooks: Vec::new(),
            filter: None,
            should_update: None,
            updated_field: None,
        }
    }

    /// Inherit from `parent`. With several parents the first one added is
    /// the nearest and wins on collisions.
    pub fn extends(mut self, parent: &IndexDefinition) -> Self {
        self.parents.push(parent.clone());
        self
    }

    /// Declare a field under `name`.
    pub fn field(mut self, name: impl Into<String>, field: FieldDescriptor) -> Self {
        self.fields.push((name.into(), field));
        self
    }

    /// Mark base fields as translatable.
    pub fn translatable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            push_unique(&mut self.translatable, name.into());
        }
        self
    }

    /// Register an override extractor for a base field name. It applies to
    /// the field and, for translatable fields, to each per-locale field.
    pub fn hook(mut self, field: impl Into<String>, extractor: impl Extractor + 'static) -> Self {
        self.hooks.push((field.into(), Arc::new(extractor)));
        self
    }

    /// Register a closure as the override for `field`.
    pub fn prepare_field<F>(self, field: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ExtractContext<'_>) -> Result<Value, ExtractionError> + Send + Sync + 'static,
    {
        self.hook(field, CustomExtractor::new(f))
    }

    /// Exclude records from full rebuilds unless `f` returns true.
    pub fn filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(f));
        self
    }

    /// Skip change events for records where `f` returns false.
    pub fn should_update<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.should_update = Some(Arc::new(f));
        self
    }

    /// Attribute holding each record's last-modified timestamp.
    pub fn updated_field(mut self, name: impl Into<String>) -> Self {
        self.updated_field = Some(name.into());
        self
    }

    /// Build the definition, expanding translatable fields for the locales
    /// configured in `settings`.
    ///
    /// Zero document fields are accepted here so that abstract bases can be
    /// built; [`crate::SearchIndex::new`] enforces exactly one.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] for settings that fail validation, for
    /// reserved or malformed field names, for translatable names without a
    /// field, and for hooks on unknown fields.
    pub fn build(self, settings: &Settings) -> Result<IndexDefinition, SchemaError> {
        settings
            .validate()
            .map_err(|source| SchemaError::InvalidSettings {
                index: self.name.clone(),
                source,
            })?;
        let locales = settings.locales();
        let mut fields: Vec<FieldDescriptor> = Vec::new();
        let mut translatable: Vec<String> = Vec::new();
        let mut hooks: HashMap<String, Arc<dyn Extractor>> = HashMap::new();
        let mut filter = None;
        let mut should_update = None;
        let mut updated_field = None;

        for parent in self.parents.iter().rev() {
            let schema = parent.schema();
            for field in schema.fields().iter().filter(|f| f.locale().is_none()) {
                upsert(&mut fields, field.clone());
            }
            for name in schema.translatable() {
                push_unique(&mut translatable, name.clone());
            }
            for (name, hook) in &parent.hooks {
                hooks.insert(name.clone(), Arc::clone(hook));
            }
            filter = parent.filter.clone().or(filter);
            should_update = parent.should_update.clone().or(should_update);
            updated_field = parent.updated_field.clone().or(updated_field);
        }

        for (name, field) in self.fields {
            validate_name(&self.name, &name)?;
            upsert(&mut fields, field.named(name));
        }
        for name in self.translatable {
            push_unique(&mut translatable, name);
        }
        for (name, hook) in self.hooks {
            hooks.insert(name, hook);
        }
        let filter = self.filter.or(filter);
        let should_update = self.should_update.or(should_update);
        let updated_field = self.updated_field.or(updated_field);

        for name in hooks.keys() {
            if !fields.iter().any(|f| f.name() == name) {
                return Err(SchemaError::UnknownHookField {
                    index: self.name.clone(),
                    field: name.clone(),
                });
            }
        }

        for name in &translatable {
            let base = fields
                .iter()
                .find(|f| f.name() == name)
                .cloned()
                .ok_or_else(|| SchemaError::UnknownTranslatableField {
                    index: self.name.clone(),
                    field: name.clone(),
                })?;
            for locale in &locales {
                upsert(&mut fields, base.localized(locale));
            }
        }

        log::debug!(
            "Built index definition '{}': {} fields ({} translatable, {} locales)",
            self.name,
            fields.len(),
            translatable.len(),
            locales.len()
        );

        Ok(IndexDefinition {
            schema: Arc::new(Schema {
                name: self.name,
                fields,
                translatable,
                locales,
            }),
            hooks,
            filter,
            should_update,
            updated_field,
        })
    }
}

fn validate_name(index: &str, name: &str) -> Result<(), SchemaError> {
    let invalid = |reason: &str| SchemaError::InvalidField {
        index: index.to_string(),
        field: name.to_string(),
        reason: reason.to_string(),
    };
    if name.trim().is_empty() {
        return Err(invalid("field names must not be empty"));
    }
    if RESERVED_FIELD_NAMES.contains(&name) {
        return Err(invalid("name is reserved for document identity"));
    }
    if name.contains(LOCALE_SEPARATOR) {
        return Err(invalid("'__' is reserved for locale suffixes"));
    }
    Ok(())
}

/// Replace a same-named field in place, or append.
fn upsert(fields: &mut Vec<FieldDescriptor>, field: FieldDescriptor) {
    match fields.iter_mut().find(|f| f.name() == field.name()) {
        Some(slot) => *slot = field,
        None => fields.push(field),
    }
}

fn push_unique(names: &mut Vec<String>, name: String) {
    if !names.contains(&name) {
        names.push(name);
    }
}

// ============================================================================
// Tests
// ============================================================================
