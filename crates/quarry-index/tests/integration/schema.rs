//! Integration tests for schema building and index construction.

use std::sync::Arc;

use quarry_core::{Error, SchemaError, Settings};
use quarry_index::field::split_field_name;
use quarry_index::{
    FieldDescriptor, FieldKind, IndexDefinition, MemoryBackend, MemorySource, SearchIndex,
};

use crate::common::{TestHarness, mock_model, note_definition};

fn construct(definition: IndexDefinition) -> Result<SearchIndex, Error> {
    SearchIndex::new(
        definition,
        Arc::new(MemorySource::new(mock_model())),
        Arc::new(MemoryBackend::default()),
    )
}

#[test]
fn test_construction_requires_exactly_one_document_field() {
    let settings = Settings::default();

    let none = IndexDefinition::builder("NoDocument")
        .field("author", FieldDescriptor::text().model_attr("author"))
        .build(&settings)
        .unwrap();
    let one = note_definition(&settings);
    let two = IndexDefinition::builder("TwoDocuments")
        .extends(&one)
        .field("body", FieldDescriptor::text().document().model_attr("foo"))
        .build(&settings)
        .unwrap();

    assert!(matches!(
        construct(none),
        Err(Error::Schema(SchemaError::DocumentFieldCount { count: 0, .. }))
    ));
    assert!(construct(one).is_ok());
    assert!(matches!(
        construct(two),
        Err(Error::Schema(SchemaError::DocumentFieldCount { count: 2, .. }))
    ));
}

#[test]
fn test_child_field_replaces_parent_field() {
    let settings = Settings::default();
    let parent = IndexDefinition::builder("Parent")
        .field("text", FieldDescriptor::text().document().use_template())
        .field("x", FieldDescriptor::text().model_attr("foo"))
        .build(&settings)
        .unwrap();
    let child = IndexDefinition::builder("Child")
        .extends(&parent)
        .field("x", FieldDescriptor::integer().model_attr("count").stored(false))
        .build(&settings)
        .unwrap();

    let x = child.schema().field("x").unwrap();
    assert_eq!(x.kind(), FieldKind::Integer);
    assert!(!x.is_stored());
    assert_eq!(child.schema().len(), 2);

    // The parent is untouched.
    assert_eq!(parent.schema().field("x").unwrap().kind(), FieldKind::Text);
}

#[test]
fn test_translatable_fan_out() {
    let harness = TestHarness::new();
    let definition = IndexDefinition::builder("Translated")
        .extends(&note_definition(&harness.settings))
        .translatable(["text"])
        .build(&harness.settings)
        .unwrap();
    let schema = definition.schema();

    for name in ["text", "text__en", "text__fr"] {
        assert!(schema.field(name).is_some(), "missing {name}");
    }
    assert!(schema.field("text").unwrap().is_document());
    assert!(!schema.field("text__en").unwrap().is_document());
    assert!(!schema.field("text__fr").unwrap().is_document());
    assert_eq!(schema.document_fields().len(), 1);

    let index = harness.index(definition);
    assert_eq!(index.document_field_name(), "text");
}

#[test]
fn test_derived_names_split_back_to_base() {
    let harness = TestHarness::with_languages(["en", "pt-br"]);
    let definition = IndexDefinition::builder("Translated")
        .extends(&note_definition(&harness.settings))
        .translatable(["author"])
        .build(&harness.settings)
        .unwrap();

    for field in definition.schema().fields() {
        let (base, suffix) = split_field_name(field.name());
        match field.locale() {
            Some(locale) => {
                assert_eq!(base, "author");
                assert_eq!(suffix, Some(locale.code()));
            }
            None => assert_eq!(suffix, None),
        }
    }
}

#[test]
fn test_schema_is_shared_between_indexes() {
    let harness = TestHarness::new();
    let definition = note_definition(&harness.settings);
    let a = harness.index(definition.clone());
    let b = harness.index(definition);
    assert!(Arc::ptr_eq(a.schema(), b.schema()));
}
