use std::path::Path;
use std::process::{Command, Output};

use kbase_core::types::{Document, EmbeddingRecord, Meta, Sections};
use kbase_vector::writer::{append_records, upsert_documents};
use kbase_vector::LanceStore;
use tempfile::TempDir;

async fn seed(db: &Path) {
    let store = LanceStore::open(db, "documents").await.expect("open");
    let sections = Sections { core_content: "start a fire with flint".to_string(), ..Sections::default() };
    upsert_documents(store.connection(), "documents", &[Document::new("fire", "Fire starting", sections)])
        .await
        .expect("documents");
    let record = EmbeddingRecord {
        id: "fire_core_content_0".to_string(),
        document_id: "fire".to_string(),
        vector: vec![0.5, 0.5, 0.5, 0.5],
        metadata: Meta::new(),
    };
    append_records(store.connection(), "core_content_embeddings", &[record]).await.expect("records");
    store.close();
}

fn write_config(dir: &Path, db: &Path, dimension: usize) -> std::path::PathBuf {
    let path = dir.join("kbase.toml");
    let body = format!(
        "[store]\nuri = \"{}\"\ndocuments_table = \"documents\"\n\n[embedding]\nprovider = \"fake\"\ndimension = {}\n\n[[axes]]\nname = \"content\"\ntiers = [\"core_content_embeddings\"]\n",
        db.display(),
        dimension
    );
    std::fs::write(&path, body).expect("config");
    path
}

fn kbase(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_kbase"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env("APP_USE_FAKE_EMBEDDINGS", "1")
        .env("RUST_LOG", "off")
        .output()
        .expect("run kbase")
}

#[tokio::test]
async fn search_refuses_to_run_against_mismatched_collections() {
    let tmp = TempDir::new().expect("tmp");
    let db = tmp.path().join("db");
    seed(&db).await;
    let config = write_config(tmp.path(), &db, 8);

    let out = kbase(&config, &["search", "fire"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("configuration does not match the store"), "stderr: {stderr}");
    assert!(stderr.contains("Dimension mismatch"), "stderr: {stderr}");
    assert!(out.stdout.is_empty());
}

#[tokio::test]
async fn search_answers_when_dimensions_agree() {
    let tmp = TempDir::new().expect("tmp");
    let db = tmp.path().join("db");
    seed(&db).await;
    let config = write_config(tmp.path(), &db, 4);

    let out = kbase(&config, &["search", "fire", "--json"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("\"dropped_count\": 0"), "stdout: {stdout}");
    assert!(stdout.contains("Fire starting"));
}
