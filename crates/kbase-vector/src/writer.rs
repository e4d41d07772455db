use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray};
use lancedb::Connection;
use std::sync::Arc;

use kbase_core::types::{Document, EmbeddingRecord};
use kbase_core::{Error, Result};

use crate::schema::{build_documents_schema, build_record_schema};
use crate::table::{open_table, table_dim, table_exists};

pub fn documents_to_record_batch(docs: &[Document]) -> Result<RecordBatch> {
	let schema = build_documents_schema();
	let mut ids = Vec::new(); let mut titles = Vec::new(); let mut core = Vec::new(); let mut detailed = Vec::new();
	let mut main_topics = Vec::new(); let mut sub_topics = Vec::new(); let mut raw = Vec::new(); let mut tocs = Vec::new(); let mut children = Vec::new();
	let mut sources = Vec::new(); let mut langs = Vec::new();
	for doc in docs {
		let s = &doc.sections;
		ids.push(doc.id.clone()); titles.push(doc.title.clone());
		core.push(s.core_content.clone()); detailed.push(s.detailed_content.clone());
		main_topics.push(s.main_topics.clone()); sub_topics.push(s.sub_topics.clone());
		raw.push(s.raw_content.clone()); tocs.push(s.table_of_contents.clone());
		children.push(serde_json::to_string(&s.child_document_ids).map_err(Error::store)?);
		sources.push(doc.source_type.clone()); langs.push(doc.language.clone());
	}
	RecordBatch::try_new(schema, vec![
		Arc::new(StringArray::from(ids)),
		Arc::new(StringArray::from(titles)),
		Arc::new(StringArray::from(core)),
		Arc::new(StringArray::from(detailed)),
		Arc::new(StringArray::from(main_topics)),
		Arc::new(StringArray::from(sub_topics)),
		Arc::new(StringArray::from(raw)),
		Arc::new(StringArray::from(tocs)),
		Arc::new(StringArray::from(children)),
		Arc::new(StringArray::from(sources)),
		Arc::new(StringArray::from(langs)),
	]).map_err(Error::store)
}

/// All records must share `dim`; a mismatch is reported against `collection`.
pub fn records_to_record_batch(collection: &str, records: &[EmbeddingRecord], dim: usize) -> Result<RecordBatch> {
	let schema = build_record_schema(dim as i32);
	let mut ids = Vec::new(); let mut doc_ids = Vec::new(); let mut metas = Vec::new(); let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::new();
	for r in records {
		if r.vector.len() != dim {
			return Err(Error::DimensionMismatch { collection: collection.to_string(), expected: dim, actual: r.vector.len() });
		}
		ids.push(r.id.clone()); doc_ids.push(r.document_id.clone());
		metas.push(serde_json::to_string(&r.metadata).map_err(Error::store)?);
		vectors.push(Some(r.vector.iter().map(|&x| Some(x)).collect()));
	}
	RecordBatch::try_new(schema, vec![
		Arc::new(StringArray::from(ids)),
		Arc::new(StringArray::from(doc_ids)),
		Arc::new(StringArray::from(metas)),
		Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), dim as i32)),
	]).map_err(Error::store)
}

/// Insert or replace documents keyed by `id`.
pub async fn upsert_documents(conn: &Connection, table: &str, docs: &[Document]) -> Result<usize> {
	if docs.is_empty() { return Ok(0); }
	let rb = documents_to_record_batch(docs)?;
	let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), build_documents_schema()));
	if table_exists(conn, table).await? {
		let t = open_table(conn, table).await?;
		// Upsert behavior via merge_insert: id is unique
		let mut mi = t.merge_insert(&["id"]);
		mi.when_matched_update_all(None).when_not_matched_insert_all();
		mi.execute(reader).await.map_err(Error::store)?;
	} else {
		conn.create_table(table, reader).execute().await.map_err(Error::store)?;
	}
	Ok(docs.len())
}

/// Append records to `collection`, creating it with the first record's dimensionality.
pub async fn append_records(conn: &Connection, collection: &str, records: &[EmbeddingRecord]) -> Result<usize> {
	let Some(first) = records.first() else { return Ok(0) };
	let exists = table_exists(conn, collection).await?;
	let dim = if exists {
		let t = open_table(conn, collection).await?;
		table_dim(&t).await?.unwrap_or(first.vector.len())
	} else {
		first.vector.len()
	};
	let rb = records_to_record_batch(collection, records, dim)?;
	let schema = rb.schema();
	let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), schema));
	if exists {
		open_table(conn, collection).await?.add(reader).execute().await.map_err(Error::store)?;
	} else {
		conn.create_table(collection, reader).execute().await.map_err(Error::store)?;
	}
	Ok(records.len())
}
