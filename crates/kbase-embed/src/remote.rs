//! OpenAI-compatible `/v1/embeddings` client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use kbase_core::traits::EmbeddingProvider;
use kbase_core::{Error, Result};

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

pub struct RemoteEmbedder {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
    dim: usize,
    id: String,
}

impl RemoteEmbedder {
    pub fn new(base_url: &str, model: &str, api_key: Option<String>, dim: usize, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self {
            client,
            url: format!("{}/v1/embeddings", base_url.trim_end_matches('/')),
            api_key,
            model: model.to_string(),
            dim,
            id: format!("remote:{}:d{}", model, dim),
        })
    }
}

/// First embedding of a response body, checked against the expected dimensionality.
fn parse_embedding(body: &str, dim: usize) -> Result<Vec<f32>> {
    let parsed: EmbedResponse = serde_json::from_str(body)
        .map_err(|e| Error::EmbeddingFailure(format!("malformed embedding response: {e}")))?;
    let embedding = parsed
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| Error::EmbeddingFailure("response contained no embeddings".to_string()))?;
    if embedding.len() != dim {
        return Err(Error::EmbeddingFailure(format!("expected {dim} dimensions, provider returned {}", embedding.len())));
    }
    Ok(embedding)
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let req = EmbedRequest { model: &self.model, input: vec![text] };
        let mut call = self.client.post(&self.url).json(&req);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }
        let resp = call.send().await.map_err(|e| Error::EmbeddingFailure(format!("embed API unreachable: {e}")))?;
        let status = resp.status();
        let body = resp.text().await.map_err(Error::embedding)?;
        if !status.is_success() {
            return Err(Error::EmbeddingFailure(format!("embed API returned {status}: {body}")));
        }
        parse_embedding(&body, self.dim)
    }
}
