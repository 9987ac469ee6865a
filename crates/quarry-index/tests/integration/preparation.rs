//! Integration tests for document preparation.

use std::sync::{Arc, Mutex};

use quarry_core::{Error, ExtractionError, Locale, SchemaError, Settings, Value};
use quarry_index::{
    AttributeExtractor, ExtractContext, FieldDescriptor, IndexDefinition, IndexDefinitionBuilder,
    RecordSource, TemplateStore,
};

use crate::common::{MOCK_TEXT_TEMPLATE, TestHarness, note_definition};

fn hooked_title() -> IndexDefinitionBuilder {
    IndexDefinition::builder("Hooked")
        .field("title", FieldDescriptor::text().document().model_attr("title"))
        .translatable(["title"])
        .prepare_field("title", |ctx: &ExtractContext<'_>| {
            let title = ctx.record.attribute("title").unwrap_or_default();
            Ok(Value::from(format!("HOOK:{}", title.to_text())))
        })
}

#[tokio::test]
async fn test_prepare_attribute_and_template_fields() {
    let harness = TestHarness::new();
    let index = harness.index(note_definition(&harness.settings));
    let record = harness.source.fetch("1", None).await.unwrap();

    let doc = index.prepare(&record).await.unwrap();

    assert_eq!(doc.len(), 2);
    assert_eq!(doc["author"], Value::from("daniel1"));
    assert_eq!(doc["text"], Value::from("Indexed!\n1"));
    assert_eq!(index.last_prepared(), Some(doc));
}

#[tokio::test]
async fn test_full_prepare_adds_identity_fields() {
    let harness = TestHarness::new();
    let index = harness.index(note_definition(&harness.settings));
    let record = harness.source.fetch("2", None).await.unwrap();

    let doc = index.full_prepare(&record).await.unwrap();

    assert_eq!(doc["id"], Value::from("core.mockmodel.2"));
    assert_eq!(doc["record_type"], Value::from("core.mockmodel"));
    assert_eq!(doc["record_id"], Value::from("2"));
    assert_eq!(doc.len(), 5);
}

#[tokio::test]
async fn test_translatable_aggregate_in_locale_order() {
    let harness = TestHarness::new();
    harness.source.translate("1", "en", "title", "Hello").await;
    harness.source.translate("1", "fr", "title", "Bonjour").await;

    let definition = IndexDefinition::builder("Translated")
        .field("title", FieldDescriptor::text().document().model_attr("title"))
        .translatable(["title"])
        .build(&harness.settings)
        .unwrap();
    let index = harness.index(definition);
    let record = harness.source.fetch("1", None).await.unwrap();

    let doc = index.prepare(&record).await.unwrap();

    assert_eq!(doc["title"], Value::from(" Hello Bonjour"));
    assert_eq!(doc["title__en"], Value::from("Hello"));
    assert_eq!(doc["title__fr"], Value::from("Bonjour"));
}

#[tokio::test]
async fn test_locale_does_not_leak_into_later_fields() {
    let harness = TestHarness::new();
    harness.source.translate("1", "fr", "title", "Bonjour").await;
    harness.source.translate("1", "fr", "foo", "baguette").await;

    let seen: Arc<Mutex<Vec<Option<Locale>>>> = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let definition = IndexDefinition::builder("Translated")
        .field("title", FieldDescriptor::text().document().model_attr("title"))
        .field("foo", FieldDescriptor::text().model_attr("foo"))
        .field("spy", FieldDescriptor::text())
        .translatable(["title"])
        .prepare_field("spy", move |ctx| {
            log.lock().unwrap().push(ctx.locale.cloned());
            Ok(ctx.record.attribute("title").unwrap_or_default())
        })
        .build(&harness.settings)
        .unwrap();
    let index = harness.index(definition);
    let record = harness.source.fetch("1", None).await.unwrap();

    let doc = index.prepare(&record).await.unwrap();

    assert_eq!(doc["title__fr"], Value::from("Bonjour"));
    assert_eq!(doc["foo"], Value::from("bar1"));
    assert_eq!(doc["spy"], Value::from("Hello 1"));
    assert_eq!(*seen.lock().unwrap(), vec![None]);

    // A second preparation starts from the same neutral state.
    let again = index.prepare(&record).await.unwrap();
    assert_eq!(again, doc);
}

#[tokio::test]
async fn test_override_hook_beats_source() {
    let harness = TestHarness::new();
    let definition = IndexDefinition::builder("Hooked")
        .extends(&note_definition(&harness.settings))
        .hook("author", AttributeExtractor::new("foo"))
        .build(&harness.settings)
        .unwrap();
    let index = harness.index(definition);
    let record = harness.source.fetch("3", None).await.unwrap();

    let doc = index.prepare(&record).await.unwrap();

    assert_eq!(doc["author"], Value::from("bar3"));
}

#[tokio::test]
async fn test_custom_hook_on_translatable_field_sees_each_locale() {
    let harness = TestHarness::new();
    let definition = IndexDefinition::builder("Hooked")
        .extends(&note_definition(&harness.settings))
        .translatable(["author"])
        .prepare_field("author", |ctx| {
            let code = ctx.locale.map(Locale::code).unwrap_or("none");
            Ok(Value::from(format!("{}-{code}", ctx.record.pk())))
        })
        .build(&harness.settings)
        .unwrap();
    let index = harness.index(definition);
    let record = harness.source.fetch("1", None).await.unwrap();

    let doc = index.prepare(&record).await.unwrap();

    assert_eq!(doc["author"], Value::from(" 1-en 1-fr"));
    assert_eq!(doc["author__en"], Value::from("1-en"));
    assert_eq!(doc["author__fr"], Value::from("1-fr"));
}

#[tokio::test]
async fn test_template_directory_and_missing_template() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("search/indexes/core")).unwrap();
    std::fs::write(
        dir.path().join(MOCK_TEXT_TEMPLATE),
        "{{ object.title }} by {{ object.author }}",
    )
    .unwrap();

    let harness = TestHarness::new();
    let index = harness
        .index(note_definition(&harness.settings))
        .with_templates(Arc::new(TemplateStore::with_dir(dir.path())));
    let record = harness.source.fetch("2", None).await.unwrap();
    let doc = index.prepare(&record).await.unwrap();
    assert_eq!(doc["text"], Value::from("Hello 2 by daniel2"));

    let index = harness
        .index(note_definition(&harness.settings))
        .with_templates(Arc::new(TemplateStore::new()));
    let err = index.prepare(&record).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Extraction(ExtractionError::Template { ref template, .. })
            if template == MOCK_TEXT_TEMPLATE
    ));
}

#[tokio::test]
async fn test_region_locale_uses_base_hook_and_refetch() {
    let harness = TestHarness::with_languages(["en", "pt-br"]);
    harness.source.translate("1", "pt-br", "title", "Ola").await;
    let index = harness.index(hooked_title().build(&harness.settings).unwrap());
    let record = harness.source.fetch("1", None).await.unwrap();

    let doc = index.prepare(&record).await.unwrap();

    assert_eq!(doc["title"], Value::from(" HOOK:Hello 1 HOOK:Ola"));
    assert_eq!(doc["title__en"], Value::from("HOOK:Hello 1"));
    assert_eq!(doc["title__pt-br"], Value::from("HOOK:Ola"));
}

#[test]
fn test_unsplittable_locale_codes_rejected_at_build() {
    for codes in [["en", "pt__br"], ["en", "en"]] {
        let err = hooked_title()
            .build(&Settings::with_languages(codes))
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidSettings { .. }), "{codes:?}");
    }
}
