use std::sync::Arc;

use kbase_core::traits::EmbeddingProvider;
use kbase_core::{Error, Result};

/// Turns query text into a query vector. One provider call per query, no caching.
pub struct QueryProcessor {
    provider: Arc<dyn EmbeddingProvider>,
}

impl QueryProcessor {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::EmptyQuery);
        }
        let vector = self.provider.embed(text).await.map_err(|e| match e {
            Error::EmbeddingFailure(_) => e,
            other => Error::embedding(other),
        })?;
        if vector.len() != self.provider.dim() {
            return Err(Error::EmbeddingFailure(format!(
                "{} returned {} components, expected {}",
                self.provider.embedder_id(),
                vector.len(),
                self.provider.dim()
            )));
        }
        Ok(vector)
    }
}
