#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use kbase_core::traits::{EmbeddingProvider, VectorStore};
use kbase_core::types::{Document, SearchHit, Sections};
use kbase_core::{Error, Result};

pub const DIM: usize = 4;

/// Fixed-vector provider that counts its calls.
pub struct StubProvider {
    pub dim: usize,
    pub returned_len: usize,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl StubProvider {
    pub fn new() -> Self {
        Self { dim: DIM, returned_len: DIM, fail: false, calls: AtomicUsize::new(0) }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::new() }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for StubProvider {
    fn embedder_id(&self) -> &str { "stub" }
    fn dim(&self) -> usize { self.dim }
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Store("embedding backend unreachable".to_string()));
        }
        Ok(vec![0.5; self.returned_len])
    }
}

/// Scripted store: canned hits per collection, optional failures and delays,
/// and per-collection call counts.
#[derive(Default)]
pub struct StubStore {
    pub hits: HashMap<String, Vec<SearchHit>>,
    pub dims: HashMap<String, usize>,
    pub failing: HashSet<String>,
    pub query_delay: HashMap<String, Duration>,
    pub documents: HashMap<String, Document>,
    pub fetch_delay: HashMap<String, Duration>,
    pub broken_documents: HashSet<String>,
    pub unreachable: bool,
    pub calls: Mutex<HashMap<String, usize>>,
    pub completed_queries: AtomicUsize,
    pub fetch_order: Mutex<Vec<String>>,
}

pub fn hit(doc: &str, distance: f32, collection: &str) -> SearchHit {
    SearchHit {
        record_id: format!("{doc}_{collection}_0"),
        document_id: doc.to_string(),
        distance,
        collection: collection.to_string(),
        metadata: HashMap::new(),
    }
}

pub fn document(id: &str) -> Document {
    Document::new(id, format!("Document {id}"), Sections { core_content: format!("core of {id}"), ..Sections::default() })
}

impl StubStore {
    pub fn new() -> Self { Self::default() }

    pub fn with_hits(mut self, collection: &str, hits: &[(&str, f32)]) -> Self {
        let list = hits.iter().map(|(d, dist)| hit(d, *dist, collection)).collect();
        self.hits.insert(collection.to_string(), list);
        self.dims.insert(collection.to_string(), DIM);
        self
    }

    pub fn with_failure(mut self, collection: &str) -> Self {
        self.failing.insert(collection.to_string());
        self
    }

    pub fn with_dim(mut self, collection: &str, dim: usize) -> Self {
        self.dims.insert(collection.to_string(), dim);
        self
    }

    pub fn with_query_delay(mut self, collection: &str, delay: Duration) -> Self {
        self.query_delay.insert(collection.to_string(), delay);
        self
    }

    pub fn with_documents(mut self, ids: &[&str]) -> Self {
        for id in ids {
            self.documents.insert((*id).to_string(), document(id));
        }
        self
    }

    pub fn with_document(mut self, doc: Document) -> Self {
        self.documents.insert(doc.id.clone(), doc);
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn with_fetch_delay(mut self, id: &str, delay: Duration) -> Self {
        self.fetch_delay.insert(id.to_string(), delay);
        self
    }

    pub fn with_broken_document(mut self, id: &str) -> Self {
        self.broken_documents.insert(id.to_string());
        self
    }

    pub fn calls(&self, collection: &str) -> usize {
        self.calls.lock().get(collection).copied().unwrap_or(0)
    }
}

#[async_trait]
impl VectorStore for StubStore {
    async fn query_nearest(&self, collection: &str, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        *self.calls.lock().entry(collection.to_string()).or_insert(0) += 1;
        if let Some(delay) = self.query_delay.get(collection) {
            tokio::time::sleep(*delay).await;
        }
        self.completed_queries.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(collection) {
            return Err(Error::Store(format!("connection to '{collection}' refused")));
        }
        let Some(hits) = self.hits.get(collection) else {
            return Err(Error::NotFound(format!("collection '{collection}'")));
        };
        if let Some(&dim) = self.dims.get(collection) {
            if dim != vector.len() {
                return Err(Error::DimensionMismatch { collection: collection.to_string(), expected: dim, actual: vector.len() });
            }
        }
        Ok(hits.iter().take(k).cloned().collect())
    }

    async fn get_document(&self, document_id: &str) -> Result<Option<Document>> {
        if let Some(delay) = self.fetch_delay.get(document_id) {
            tokio::time::sleep(*delay).await;
        }
        self.fetch_order.lock().push(document_id.to_string());
        if self.broken_documents.contains(document_id) {
            return Err(Error::Store("documents table unavailable".to_string()));
        }
        Ok(self.documents.get(document_id).cloned())
    }

    async fn collection_dim(&self, collection: &str) -> Result<Option<usize>> {
        if !self.hits.contains_key(collection) {
            return Err(Error::NotFound(format!("collection '{collection}'")));
        }
        Ok(self.dims.get(collection).copied())
    }

    async fn count_records(&self, collection: &str) -> Result<usize> {
        if self.failing.contains(collection) {
            return Err(Error::Store(format!("connection to '{collection}' refused")));
        }
        self.hits
            .get(collection)
            .map(Vec::len)
            .ok_or_else(|| Error::NotFound(format!("collection '{collection}'")))
    }

    async fn ping(&self) -> Result<()> {
        if self.unreachable {
            return Err(Error::Store("connection refused".to_string()));
        }
        Ok(())
    }
}
