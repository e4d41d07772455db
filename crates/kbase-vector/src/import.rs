//! Bulk import of exported corpora (JSON Lines) into LanceDB.
//!
//! `documents.jsonl`: one `Document` per line.
//! `records.jsonl`: one `EmbeddingRecord` per line plus a `collection` field.

use indicatif::{ProgressBar, ProgressStyle};
use lancedb::Connection;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader};
use std::path::Path;

use kbase_core::types::{Document, EmbeddingRecord};
use kbase_core::{Error, Result};

use crate::writer::{append_records, upsert_documents};

const BATCH_SIZE: usize = 500;

#[derive(Debug, Deserialize)]
pub struct ImportRecord {
	pub collection: String,
	#[serde(flatten)]
	pub record: EmbeddingRecord,
}

#[derive(Debug, Default)]
pub struct ImportSummary {
	pub documents: usize,
	pub records: BTreeMap<String, usize>,
}

fn read_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
	let file = std::fs::File::open(path).map_err(|e| Error::InvalidArgument(format!("{}: {}", path.display(), e)))?;
	let mut out = Vec::new();
	for (n, line) in BufReader::new(file).lines().enumerate() {
		let line = line.map_err(|e| Error::InvalidArgument(format!("{}: {}", path.display(), e)))?;
		if line.trim().is_empty() { continue; }
		let item = serde_json::from_str(&line)
			.map_err(|e| Error::InvalidArgument(format!("{}:{}: {}", path.display(), n + 1, e)))?;
		out.push(item);
	}
	Ok(out)
}

fn progress(len: usize, what: &str) -> ProgressBar {
	let pb = ProgressBar::new(len as u64);
	if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}") {
		pb.set_style(style.progress_chars("#>-"));
	}
	pb.set_message(what.to_string());
	pb
}

pub async fn import_documents(conn: &Connection, table: &str, path: &Path) -> Result<usize> {
	let docs: Vec<Document> = read_jsonl(path)?;
	let pb = progress(docs.len(), "documents");
	let mut written = 0usize;
	for batch in docs.chunks(BATCH_SIZE) {
		written += upsert_documents(conn, table, batch).await?;
		pb.set_position(written as u64);
	}
	pb.finish_and_clear();
	tracing::info!(written, table, "documents imported");
	Ok(written)
}

pub async fn import_records(conn: &Connection, path: &Path) -> Result<BTreeMap<String, usize>> {
	let rows: Vec<ImportRecord> = read_jsonl(path)?;
	let pb = progress(rows.len(), "records");
	let mut by_collection: BTreeMap<String, Vec<EmbeddingRecord>> = BTreeMap::new();
	for row in rows { by_collection.entry(row.collection).or_default().push(row.record); }
	let mut counts = BTreeMap::new();
	let mut done = 0usize;
	for (collection, records) in by_collection {
		let mut n = 0usize;
		for batch in records.chunks(BATCH_SIZE) {
			n += append_records(conn, &collection, batch).await?;
			done += batch.len();
			pb.set_position(done as u64);
		}
		tracing::info!(collection = %collection, records = n, "collection imported");
		counts.insert(collection, n);
	}
	pb.finish_and_clear();
	Ok(counts)
}

pub async fn import_corpus(conn: &Connection, documents_table: &str, documents: Option<&Path>, records: Option<&Path>) -> Result<ImportSummary> {
	let mut summary = ImportSummary::default();
	if let Some(path) = documents { summary.documents = import_documents(conn, documents_table, path).await?; }
	if let Some(path) = records { summary.records = import_records(conn, path).await?; }
	Ok(summary)
}
