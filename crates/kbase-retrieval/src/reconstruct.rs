use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use kbase_core::traits::VectorStore;
use kbase_core::types::{MergedHit, ReconstructedAnswer};

#[derive(Debug, Clone, Default, Serialize)]
pub struct Reconstruction {
    pub answers: Vec<ReconstructedAnswer>,
    /// Hits whose document could not be fetched.
    pub dropped_count: usize,
}

/// Expands ranked hits into full documents.
pub struct DocumentReconstructor {
    store: Arc<dyn VectorStore>,
    concurrency: usize,
}

impl DocumentReconstructor {
    pub fn new(store: Arc<dyn VectorStore>, concurrency: usize) -> Self {
        Self { store, concurrency: concurrency.max(1) }
    }

    /// Output keeps the input rank order regardless of fetch completion order.
    /// Missing documents and failed fetches are dropped and counted.
    pub async fn reconstruct(&self, hits: &[MergedHit]) -> Reconstruction {
        let store = &self.store;
        let mut fetched: Vec<_> = stream::iter(hits.iter().enumerate())
            .map(|(rank, hit)| async move { (rank, store.get_document(&hit.document_id).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        fetched.sort_by_key(|(rank, _)| *rank);

        let mut out = Reconstruction::default();
        for (rank, result) in fetched {
            let hit = &hits[rank];
            match result {
                Ok(Some(document)) => out.answers.push(ReconstructedAnswer {
                    document,
                    distance: hit.distance,
                    axis: hit.axis.clone(),
                    matched_section_type: hit.matched_section_type().to_string(),
                }),
                Ok(None) => {
                    tracing::warn!(document_id = %hit.document_id, collection = %hit.collection, "document missing for indexed record");
                    out.dropped_count += 1;
                }
                Err(e) => {
                    tracing::warn!(document_id = %hit.document_id, error = %e, "document fetch failed");
                    out.dropped_count += 1;
                }
            }
        }
        out
    }
}
