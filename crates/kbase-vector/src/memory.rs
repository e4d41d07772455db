//! In-process `VectorStore` with exact cosine distance.
//!
//! Suitable for tests, demos and small corpora that fit in memory.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use kbase_core::traits::VectorStore;
use kbase_core::types::{Document, EmbeddingRecord, SearchHit};
use kbase_core::{Error, Result};

struct Collection {
    dim: usize,
    records: Vec<EmbeddingRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    documents: RwLock<HashMap<String, Document>>,
}

/// `1 - cos(a, b)`, clamped to `[0, 2]`. Zero vectors are maximally unrelated.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 1.0;
    }
    (1.0 - dot / (na.sqrt() * nb.sqrt())).clamp(0.0, 2.0)
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn insert_document(&self, doc: Document) {
        self.documents.write().insert(doc.id.clone(), doc);
    }

    pub fn remove_document(&self, document_id: &str) -> Option<Document> {
        self.documents.write().remove(document_id)
    }

    /// The first record fixes the collection's dimensionality.
    pub fn insert_record(&self, collection: &str, record: EmbeddingRecord) -> Result<()> {
        let mut collections = self.collections.write();
        let entry = collections
            .entry(collection.to_string())
            .or_insert_with(|| Collection { dim: record.vector.len(), records: Vec::new() });
        if entry.dim != record.vector.len() {
            return Err(Error::DimensionMismatch { collection: collection.to_string(), expected: entry.dim, actual: record.vector.len() });
        }
        entry.records.push(record);
        Ok(())
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn query_nearest(&self, collection: &str, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let collections = self.collections.read();
        let coll = collections
            .get(collection)
            .ok_or_else(|| Error::NotFound(format!("collection '{}'", collection)))?;
        if coll.dim != vector.len() {
            return Err(Error::DimensionMismatch { collection: collection.to_string(), expected: coll.dim, actual: vector.len() });
        }
        let mut hits: Vec<SearchHit> = coll
            .records
            .iter()
            .map(|r| SearchHit {
                record_id: r.id.clone(),
                document_id: r.document_id.clone(),
                distance: cosine_distance(vector, &r.vector),
                collection: collection.to_string(),
                metadata: r.metadata.clone(),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.record_id.cmp(&b.record_id)));
        hits.truncate(k);
        Ok(hits)
    }

    async fn get_document(&self, document_id: &str) -> Result<Option<Document>> {
        Ok(self.documents.read().get(document_id).cloned())
    }

    async fn collection_dim(&self, collection: &str) -> Result<Option<usize>> {
        self.collections
            .read()
            .get(collection)
            .map(|c| Some(c.dim))
            .ok_or_else(|| Error::NotFound(format!("collection '{}'", collection)))
    }

    async fn count_records(&self, collection: &str) -> Result<usize> {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.records.len())
            .ok_or_else(|| Error::NotFound(format!("collection '{}'", collection)))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
