//! LanceDB-backed `VectorStore`.
//!
//! Each collection is one Lance table (see `schema::build_record_schema`);
//! documents live in a separate table. The underlying `Connection` is a shared
//! handle, so one `LanceStore` serves any number of concurrent queries.

use arrow_array::{Array, Float32Array, RecordBatch, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType};
use std::path::Path;

use kbase_core::traits::VectorStore;
use kbase_core::types::{Document, Meta, SearchHit, Sections};
use kbase_core::{Error, Result};

use crate::schema::{build_documents_schema, DISTANCE_COLUMN};
use crate::table::{count_rows, ensure_table, open_db, open_table, table_dim};

pub struct LanceStore {
	db: Connection,
	documents_table: String,
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<StringArray>())
		.ok_or_else(|| Error::Store(format!("column '{}' missing or not utf8", name)))
}

fn optional_string(col: &StringArray, row: usize) -> Option<String> {
	if col.is_null(row) { None } else { Some(col.value(row).to_string()) }
}

fn sql_quote(s: &str) -> String {
	format!("'{}'", s.replace('\'', "''"))
}

impl LanceStore {
	pub async fn open(db_path: &Path, documents_table: &str) -> Result<Self> {
		let db = open_db(db_path.to_string_lossy().as_ref()).await?;
		ensure_table(&db, documents_table, build_documents_schema()).await?;
		tracing::info!(path = %db_path.display(), documents_table, "lance store opened");
		Ok(Self { db, documents_table: documents_table.to_string() })
	}

	pub fn connection(&self) -> &Connection { &self.db }

	pub fn documents_table(&self) -> &str { &self.documents_table }

	/// Consumes the store. Dropping the `Connection` releases its table handles
	/// and object-store clients; clones of the connection keep them alive.
	pub fn close(self) {
		tracing::info!(documents_table = %self.documents_table, "lance store closed");
		drop(self.db);
	}

	fn hits_from_batch(collection: &str, batch: &RecordBatch, out: &mut Vec<SearchHit>) -> Result<()> {
		let ids = string_col(batch, "id")?;
		let doc_ids = string_col(batch, "document_id")?;
		let metas = string_col(batch, "metadata")?;
		let distances = batch
			.column_by_name(DISTANCE_COLUMN)
			.and_then(|c| c.as_any().downcast_ref::<Float32Array>())
			.ok_or_else(|| Error::Store(format!("'{}' returned no distance column", collection)))?;
		for i in 0..batch.num_rows() {
			let metadata: Meta = serde_json::from_str(metas.value(i))
				.map_err(|e| Error::Store(format!("'{}' record {}: bad metadata: {}", collection, ids.value(i), e)))?;
			out.push(SearchHit {
				record_id: ids.value(i).to_string(),
				document_id: doc_ids.value(i).to_string(),
				distance: distances.value(i).max(0.0),
				collection: collection.to_string(),
				metadata,
			});
		}
		Ok(())
	}

	fn document_from_batch(batch: &RecordBatch, row: usize) -> Result<Document> {
		let toc = string_col(batch, "table_of_contents")?;
		let sources = string_col(batch, "source_type")?;
		let langs = string_col(batch, "document_language")?;
		let children: Vec<String> = serde_json::from_str(string_col(batch, "child_document_ids")?.value(row)).map_err(Error::store)?;
		Ok(Document {
			id: string_col(batch, "id")?.value(row).to_string(),
			title: string_col(batch, "title")?.value(row).to_string(),
			sections: Sections {
				core_content: string_col(batch, "core_content")?.value(row).to_string(),
				detailed_content: string_col(batch, "detailed_content")?.value(row).to_string(),
				main_topics: string_col(batch, "main_topics")?.value(row).to_string(),
				sub_topics: string_col(batch, "sub_topics")?.value(row).to_string(),
				raw_content: string_col(batch, "raw_content")?.value(row).to_string(),
				table_of_contents: optional_string(toc, row),
				child_document_ids: children,
			},
			source_type: optional_string(sources, row),
			language: optional_string(langs, row),
		})
	}
}

#[async_trait]
impl VectorStore for LanceStore {
	async fn query_nearest(&self, collection: &str, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
		let table = open_table(&self.db, collection).await?;
		if let Some(dim) = table_dim(&table).await? {
			if dim != vector.len() {
				return Err(Error::DimensionMismatch { collection: collection.to_string(), expected: dim, actual: vector.len() });
			}
		}
		let mut stream = table
			.vector_search(vector.to_vec())
			.map_err(Error::store)?
			.distance_type(DistanceType::Cosine)
			.limit(k)
			.execute()
			.await
			.map_err(Error::store)?;
		let mut hits = Vec::new();
		while let Some(batch) = stream.try_next().await.map_err(Error::store)? {
			Self::hits_from_batch(collection, &batch, &mut hits)?;
		}
		hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
		hits.truncate(k);
		Ok(hits)
	}

	async fn get_document(&self, document_id: &str) -> Result<Option<Document>> {
		let table = open_table(&self.db, &self.documents_table).await?;
		let mut stream = table
			.query()
			.only_if(format!("id = {}", sql_quote(document_id)))
			.limit(1)
			.execute()
			.await
			.map_err(Error::store)?;
		while let Some(batch) = stream.try_next().await.map_err(Error::store)? {
			if batch.num_rows() == 0 { continue; }
			return Self::document_from_batch(&batch, 0).map(Some);
		}
		Ok(None)
	}

	async fn collection_dim(&self, collection: &str) -> Result<Option<usize>> {
		let table = open_table(&self.db, collection).await?;
		table_dim(&table).await
	}

	async fn count_records(&self, collection: &str) -> Result<usize> {
		let table = open_table(&self.db, collection).await?;
		count_rows(&table).await
	}

	async fn ping(&self) -> Result<()> {
		self.db.table_names().execute().await.map(|_| ()).map_err(Error::store)
	}
}
