use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Document, SearchHit};

/// Maps text to a fixed-length vector.
///
/// Implementations may run a local model or call a remote API. Every vector
/// returned by one provider has `dim()` components.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `local:bge-m3:d1024`).
    fn embedder_id(&self) -> &str;
    fn dim(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Nearest-neighbour queries over named collections plus document lookup.
///
/// Implementations must tolerate many in-flight calls at once.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// The `k` nearest records in `collection`, ascending by distance.
    ///
    /// Fails with `Error::DimensionMismatch` when `vector` does not match the
    /// collection's dimensionality.
    async fn query_nearest(&self, collection: &str, vector: &[f32], k: usize) -> Result<Vec<SearchHit>>;

    /// `Ok(None)` when the document does not exist.
    async fn get_document(&self, document_id: &str) -> Result<Option<Document>>;

    /// Dimensionality of `collection`, `None` when it is empty or untyped.
    async fn collection_dim(&self, collection: &str) -> Result<Option<usize>>;

    async fn count_records(&self, collection: &str) -> Result<usize>;

    /// Cheap round trip proving the backing store is reachable.
    async fn ping(&self) -> Result<()>;
}
