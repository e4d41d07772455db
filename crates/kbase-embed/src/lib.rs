//! Embedding providers for query vectors.
//!
//! `build_provider` picks the implementation named in configuration.
//! `APP_USE_FAKE_EMBEDDINGS=1` forces the hashing fake regardless, which keeps
//! tests and development runs free of model downloads.

use std::sync::Arc;
use std::time::Duration;

use kbase_core::config::{EmbeddingSettings, ProviderKind};
use kbase_core::traits::EmbeddingProvider;
use kbase_core::{Error, Result};

pub mod device;
pub mod fake;
pub mod local;
pub mod pool;
pub mod remote;
pub mod tokenize;

pub use fake::HashEmbedder;
pub use local::LocalEmbedder;
pub use pool::masked_mean_l2;
pub use remote::RemoteEmbedder;

pub fn use_fake_from_env() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

pub fn build_provider(settings: &EmbeddingSettings) -> Result<Arc<dyn EmbeddingProvider>> {
    if use_fake_from_env() || settings.provider == ProviderKind::Fake {
        tracing::info!(dim = settings.dimension, "using hashing fake embedder");
        return Ok(Arc::new(HashEmbedder::new(settings.dimension)));
    }
    match settings.provider {
        ProviderKind::Remote => {
            let base_url = settings
                .base_url
                .as_deref()
                .ok_or_else(|| Error::InvalidConfig("embedding.base_url is required for the remote provider".to_string()))?;
            let api_key = settings.api_key.clone().or_else(|| std::env::var("OPENAI_API_KEY").ok());
            let provider = RemoteEmbedder::new(base_url, &settings.model, api_key, settings.dimension, Duration::from_secs(settings.timeout_secs))?;
            Ok(Arc::new(provider))
        }
        ProviderKind::Local | ProviderKind::Fake => {
            let dir = local::resolve_model_dir(settings.model_dir.as_deref()).map_err(|e| Error::InvalidConfig(e.to_string()))?;
            let provider = LocalEmbedder::load(&dir).map_err(|e| Error::InvalidConfig(format!("loading model: {e}")))?;
            if provider.dim() != settings.dimension {
                return Err(Error::InvalidConfig(format!(
                    "embedding.dimension is {} but model {} produces {}",
                    settings.dimension,
                    provider.embedder_id(),
                    provider.dim()
                )));
            }
            Ok(Arc::new(provider))
        }
    }
}
