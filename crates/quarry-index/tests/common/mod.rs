//! Common test utilities and harness for quarry-index integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use quarry_core::{Record, RecordType, Settings};
use quarry_index::{
    FieldDescriptor, IndexDefinition, MemoryBackend, MemorySource, SearchIndex, TemplateStore,
};

/// Default template of the `text` field of `core.mockmodel`.
pub const MOCK_TEXT_TEMPLATE: &str = "search/indexes/core/mockmodel_text.txt";

/// Test harness for integration tests.
///
/// Holds settings, an in-memory source for `core.mockmodel`, a shared
/// in-memory backend and a template store.
pub struct TestHarness {
    /// Settings used to build definitions and the backend.
    pub settings: Settings,
    /// Record source for `core.mockmodel`.
    pub source: Arc<MemorySource>,
    /// Shared backend.
    pub backend: Arc<MemoryBackend>,
    /// Template store handed to every index.
    pub templates: Arc<TemplateStore>,
}

impl TestHarness {
    /// Creates a harness with languages `[en, fr]` and three mock records.
    pub fn new() -> Self {
        Self::with_languages(["en", "fr"])
    }

    /// Creates a harness with the given languages and three mock records.
    pub fn with_languages<const N: usize>(codes: [&str; N]) -> Self {
        let settings = Settings::with_languages(codes);
        let backend = Arc::new(MemoryBackend::new(&settings));
        let source = Arc::new(MemorySource::with_records(mock_model(), mock_records()));
        let templates = Arc::new(
            TemplateStore::new().with_template(MOCK_TEXT_TEMPLATE, "Indexed!\n{{ object.pk }}"),
        );
        Self {
            settings,
            source,
            backend,
            templates,
        }
    }

    /// Binds `definition` to the harness source and backend.
    pub fn index(&self, definition: IndexDefinition) -> SearchIndex {
        SearchIndex::new(definition, self.source.clone(), self.backend.clone())
            .expect("definition should have one document field")
            .with_templates(self.templates.clone())
    }

    /// Binds `definition` to a fresh source of `record_type` holding
    /// `records`, sharing the harness backend.
    pub fn index_for(
        &self,
        definition: IndexDefinition,
        record_type: RecordType,
        records: Vec<Record>,
    ) -> SearchIndex {
        let source = Arc::new(MemorySource::with_records(record_type, records));
        SearchIndex::new(definition, source, self.backend.clone())
            .expect("definition should have one document field")
            .with_templates(self.templates.clone())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// The `core.mockmodel` record type.
pub fn mock_model() -> RecordType {
    RecordType::new("core", "MockModel")
}

/// Another record type, never registered with data.
pub fn another_model() -> RecordType {
    RecordType::new("core", "AnotherMockModel")
}

/// Three mock records with authors `daniel1..3`.
pub fn mock_records() -> Vec<Record> {
    (1..=3)
        .map(|i| {
            Record::new(mock_model(), i.to_string())
                .with("author", format!("daniel{i}"))
                .with("title", format!("Hello {i}"))
                .with("foo", format!("bar{i}"))
        })
        .collect()
}

/// The classic definition: templated document field `text` and `author`
/// read from the record.
pub fn note_definition(settings: &Settings) -> IndexDefinition {
    IndexDefinition::builder("GoodMockSearchIndex")
        .field("text", FieldDescriptor::text().document().use_template())
        .field("author", FieldDescriptor::text().model_attr("author"))
        .build(settings)
        .expect("definition should build")
}
