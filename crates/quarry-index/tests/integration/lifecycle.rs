//! Integration tests for the index lifecycle and the registry.

use std::sync::Arc;

use quarry_core::{Record, Settings, Value};
use quarry_index::{
    ChangeEvent, FieldDescriptor, IndexDefinition, IndexRegistry, SearchBackend, SearchParams,
};

use crate::common::{TestHarness, another_model, mock_model, mock_records, note_definition};

#[tokio::test]
async fn test_scoped_clear_only_touches_named_types() {
    let harness = TestHarness::new();
    let index = harness.index(note_definition(&harness.settings));
    index.update().await.unwrap();
    assert_eq!(harness.backend.count(&mock_model()).await, 3);
    assert_eq!(harness.backend.count(&another_model()).await, 0);

    harness
        .backend
        .clear(Some(&[another_model()]))
        .await
        .unwrap();
    assert_eq!(harness.backend.len().await, 3);

    harness.backend.clear(Some(&[mock_model()])).await.unwrap();
    assert_eq!(harness.backend.len().await, 0);
}

#[tokio::test]
async fn test_reindex_is_idempotent() {
    let harness = TestHarness::new();
    let index = harness.index(note_definition(&harness.settings));

    index.reindex().await.unwrap();
    assert_eq!(harness.backend.len().await, 3);

    index.reindex().await.unwrap();
    index.reindex().await.unwrap();
    assert_eq!(harness.backend.len().await, 3);

    let doc = harness.backend.document("core.mockmodel.1").await.unwrap();
    assert_eq!(doc.fields["author"], Value::from("daniel1"));
}

#[tokio::test]
async fn test_index_clear_keeps_other_types() {
    let harness = TestHarness::new();
    let notes = harness.index(note_definition(&harness.settings));
    let others = harness.index_for(
        IndexDefinition::builder("Other")
            .field("text", FieldDescriptor::text().document().model_attr("author"))
            .build(&harness.settings)
            .unwrap(),
        another_model(),
        vec![Record::new(another_model(), "9").with("author", "jane")],
    );
    notes.update().await.unwrap();
    others.update().await.unwrap();
    assert_eq!(harness.backend.len().await, 4);

    notes.clear().await.unwrap();
    assert_eq!(harness.backend.len().await, 1);
    let other = harness.backend.document("core.anothermockmodel.9").await;
    assert!(other.is_some());
}

#[tokio::test]
async fn test_update_one_and_remove_one() {
    let harness = TestHarness::new();
    let index = harness.index(note_definition(&harness.settings));
    let records = mock_records();

    index.update_one(&records[0]).await.unwrap();
    index.update_one(&records[1]).await.unwrap();
    assert_eq!(harness.backend.len().await, 2);

    index.remove_one(&records[0]).await.unwrap();
    assert_eq!(harness.backend.len().await, 1);
    let kept = harness.backend.document("core.mockmodel.2").await;
    assert!(kept.is_some());
}

#[tokio::test]
async fn test_search_after_reindex() {
    let harness = TestHarness::new();
    let definition = IndexDefinition::builder("Searchable")
        .extends(&note_definition(&harness.settings))
        .build(&harness.settings)
        .unwrap();
    let index = harness.index(definition);
    index.reindex().await.unwrap();

    let results = harness
        .backend
        .search(SearchParams {
            query: "indexed".to_string(),
            facets: vec!["author".to_string()],
            narrow_queries: vec!["author:daniel2".to_string()],
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(results.total, 1);
    assert_eq!(results.items[0].pk, "2");
    assert_eq!(
        results.facets.fields["author"],
        vec![("daniel2".to_string(), 1)]
    );
}

#[tokio::test]
async fn test_registry_dispatches_change_events() {
    let harness = TestHarness::new();
    let mut registry = IndexRegistry::new();
    registry
        .register(Arc::new(harness.index(note_definition(&harness.settings))))
        .unwrap();

    let record = mock_records().remove(0);
    let saved = ChangeEvent::Saved(record.clone());
    assert!(registry.dispatch(&saved).await.unwrap());
    assert_eq!(harness.backend.len().await, 1);

    let stranger = Record::new(another_model(), "1");
    let unknown = ChangeEvent::Deleted(stranger);
    assert!(!registry.dispatch(&unknown).await.unwrap());

    let deleted = ChangeEvent::Deleted(record);
    registry.dispatch(&deleted).await.unwrap();
    assert!(harness.backend.is_empty().await);
    assert_eq!(registry.all_field_names(), vec!["author", "text"]);
}

#[tokio::test]
async fn test_settings_file_drives_fan_out() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("quarry.toml");
    std::fs::write(
        &path,
        r#"
batch_size = 2

[[languages]]
code = "de"
name = "German"

[[languages]]
code = "en"
name = "English"
"#,
    )
    .unwrap();
    let settings = Settings::load(&path).unwrap();

    let definition = IndexDefinition::builder("Translated")
        .extends(&note_definition(&settings))
        .translatable(["author"])
        .build(&settings)
        .unwrap();
    let names: Vec<&str> = definition.schema().field_names().collect();
    assert_eq!(names, ["text", "author", "author__de", "author__en"]);
}
