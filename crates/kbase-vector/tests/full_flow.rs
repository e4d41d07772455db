use std::io::Write;

use kbase_core::traits::VectorStore;
use kbase_core::types::{Document, EmbeddingRecord, Meta, Sections, SectionType};
use kbase_core::Error;
use kbase_embed::HashEmbedder;
use kbase_vector::writer::{append_records, upsert_documents};
use kbase_vector::LanceStore;
use tempfile::TempDir;

const DIM: usize = 32;

fn doc(id: &str, title: &str, core: &str) -> Document {
    Document {
        id: id.to_string(),
        title: title.to_string(),
        sections: Sections {
            core_content: core.to_string(),
            table_of_contents: if id == "fire" { Some("1. Tinder".to_string()) } else { None },
            child_document_ids: vec![format!("{}-child", id)],
            ..Sections::default()
        },
        source_type: Some("manual".to_string()),
        language: if id == "water" { Some("ko".to_string()) } else { None },
    }
}

fn core_record(e: &HashEmbedder, d: &Document) -> EmbeddingRecord {
    let mut metadata = Meta::new();
    metadata.insert("section_type".to_string(), "core_content".into());
    metadata.insert("content_length".to_string(), d.sections.core_content.len().into());
    EmbeddingRecord {
        id: EmbeddingRecord::conventional_id(&d.id, SectionType::CoreContent, "0"),
        document_id: d.id.clone(),
        vector: e.embed_sync(&d.sections.core_content),
        metadata,
    }
}

#[tokio::test]
async fn lancedb_full_flow() {
    let tmp = TempDir::new().expect("tmp");
    let store = LanceStore::open(tmp.path(), "documents").await.expect("open");
    let e = HashEmbedder::new(DIM);

    let docs = vec![
        doc("fire", "Fire starting", "build a fire with flint and dry tinder"),
        doc("water", "Water", "boil river water before drinking"),
        doc("shelter", "Shelter", "lean-to shelter from branches and leaves"),
    ];
    assert_eq!(upsert_documents(store.connection(), "documents", &docs).await.expect("docs"), 3);
    let records: Vec<EmbeddingRecord> = docs.iter().map(|d| core_record(&e, d)).collect();
    append_records(store.connection(), "core_content_embeddings", &records).await.expect("records");

    assert_eq!(store.collection_dim("core_content_embeddings").await.unwrap(), Some(DIM));
    assert_eq!(store.count_records("core_content_embeddings").await.unwrap(), 3);

    let q = e.embed_sync("fire with flint");
    let hits = store.query_nearest("core_content_embeddings", &q, 2).await.expect("search");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].document_id, "fire");
    assert!(hits[0].distance <= hits[1].distance);
    assert_eq!(hits[0].metadata.get("section_type").and_then(|v| v.as_str()), Some("core_content"));
    assert_eq!(hits[0].metadata.get("content_length").and_then(|v| v.as_u64()), Some(docs[0].sections.core_content.len() as u64));

    let fetched = store.get_document("fire").await.expect("get").expect("present");
    assert_eq!(fetched, docs[0]);
    let water = store.get_document("water").await.unwrap().unwrap();
    assert!(water.sections.table_of_contents.is_none());
    assert_eq!((water.source_type.as_deref(), water.language.as_deref()), (Some("manual"), Some("ko")));
    assert!(store.ping().await.is_ok());
    assert!(store.get_document("missing").await.unwrap().is_none());

    let err = store.query_nearest("core_content_embeddings", &[0.5; 3], 2).await.err().expect("mismatch");
    assert!(matches!(err, Error::DimensionMismatch { expected: DIM, actual: 3, .. }), "got {err:?}");
    assert!(matches!(store.query_nearest("nope", &q, 2).await, Err(Error::NotFound(_))));
    store.close();
}

#[tokio::test]
async fn upsert_replaces_documents_by_id() {
    let tmp = TempDir::new().expect("tmp");
    let store = LanceStore::open(tmp.path(), "documents").await.expect("open");
    upsert_documents(store.connection(), "documents", &[doc("a", "Old", "x")]).await.unwrap();
    upsert_documents(store.connection(), "documents", &[doc("a", "New", "y")]).await.unwrap();
    let a = store.get_document("a").await.unwrap().unwrap();
    assert_eq!(a.title, "New");

    store.close();
    let reopened = LanceStore::open(tmp.path(), "documents").await.expect("reopen");
    assert_eq!(reopened.get_document("a").await.unwrap().unwrap().title, "New");
    assert_eq!(reopened.count_records("documents").await.unwrap(), 1);
}

#[tokio::test]
async fn import_jsonl_corpus() {
    let tmp = TempDir::new().expect("tmp");
    let db = tmp.path().join("db");
    let store = LanceStore::open(&db, "documents").await.expect("open");
    let docs_path = tmp.path().join("documents.jsonl");
    let recs_path = tmp.path().join("records.jsonl");
    let mut f = std::fs::File::create(&docs_path).unwrap();
    writeln!(f, r#"{{"id":"a","title":"A","sections":{{"core_content":"alpha"}}}}"#).unwrap();
    writeln!(f).unwrap();
    writeln!(f, r#"{{"id":"b","title":"B","source_type":"web","document_language":"en"}}"#).unwrap();
    let mut f = std::fs::File::create(&recs_path).unwrap();
    writeln!(f, r#"{{"collection":"main_topics_embeddings","id":"a_main_topics_0","document_id":"a","vector":[1.0,0.0]}}"#).unwrap();
    writeln!(f, r#"{{"collection":"sub_topics_embeddings","id":"b_sub_topics_0","document_id":"b","vector":[0.0,1.0],"metadata":{{"lang":"en","section_type":"sub_topics","content_length":42}}}}"#).unwrap();

    let summary = kbase_vector::import::import_corpus(store.connection(), "documents", Some(&docs_path), Some(&recs_path))
        .await
        .expect("import");
    assert_eq!(summary.documents, 2);
    assert_eq!(summary.records.get("main_topics_embeddings"), Some(&1));
    assert_eq!(summary.records.get("sub_topics_embeddings"), Some(&1));
    assert_eq!(store.get_document("a").await.unwrap().unwrap().sections.core_content, "alpha");
    let b = store.get_document("b").await.unwrap().unwrap();
    assert_eq!((b.source_type.as_deref(), b.language.as_deref()), (Some("web"), Some("en")));
    let hits = store.query_nearest("sub_topics_embeddings", &[0.0, 1.0], 5).await.unwrap();
    assert_eq!(hits[0].metadata.get("lang").and_then(|v| v.as_str()), Some("en"));
    assert_eq!(hits[0].metadata.get("content_length"), Some(&serde_json::json!(42)));
    assert_eq!(hits[0].metadata.get("section_type").and_then(|v| v.as_str()), Some("sub_topics"));
}

#[tokio::test]
async fn undecodable_metadata_is_a_store_error() {
    use arrow_array::{types::Float32Type, FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray};
    use std::sync::Arc;

    let tmp = TempDir::new().expect("tmp");
    let store = LanceStore::open(tmp.path(), "documents").await.expect("open");
    let schema = kbase_vector::schema::build_record_schema(2);
    let batch = RecordBatch::try_new(schema.clone(), vec![
        Arc::new(StringArray::from(vec!["a_core_content_0"])),
        Arc::new(StringArray::from(vec!["a"])),
        Arc::new(StringArray::from(vec!["not json"])),
        Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vec![Some(vec![Some(1.0f32), Some(0.0)])], 2)),
    ]).expect("batch");
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
    store.connection().create_table("core_content_embeddings", reader).execute().await.expect("create");

    let err = store.query_nearest("core_content_embeddings", &[1.0, 0.0], 1).await.err().expect("bad metadata");
    assert!(matches!(err, Error::Store(ref m) if m.contains("bad metadata")), "got {err:?}");
}
