//! Local transformer embedder (BGE-M3 / XLM-RoBERTa) running on candle.
//!
//! Inference is CPU/GPU bound, so every call is moved onto tokio's blocking pool.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use kbase_core::traits::EmbeddingProvider;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_on_device;

const MAX_LEN: usize = 256;

struct Model {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl Model {
    fn embed_blocking(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, MAX_LEN, &self.device)?;
        let token_type_ids = Tensor::zeros((1, MAX_LEN), DType::I64, &self.device)?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let emb: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if start.elapsed().as_millis() > 100 { tracing::warn!(elapsed_ms = start.elapsed().as_millis() as u64, "slow embedding"); }
        Ok(emb)
    }
}

pub struct LocalEmbedder {
    inner: Arc<Model>,
    dim: usize,
    id: String,
}

impl LocalEmbedder {
    /// Load tokenizer, config and weights from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "loading embedding model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        let dim = config.hidden_size;
        let name = model_dir.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| "model".to_string());
        tracing::info!(dim, "embedding model loaded");
        Ok(Self { inner: Arc::new(Model { model, tokenizer, device }), dim, id: format!("local:{}:d{}", name, dim) })
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }

    async fn embed(&self, text: &str) -> kbase_core::Result<Vec<f32>> {
        let model = Arc::clone(&self.inner);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || model.embed_blocking(&text))
            .await
            .map_err(kbase_core::Error::embedding)?
            .map_err(kbase_core::Error::embedding)
    }
}

/// Explicit dir, then `APP_MODEL_DIR` / `MODEL_DIR`, then the conventional `models/bge-m3` locations.
pub fn resolve_model_dir(explicit: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = explicit { let p = kbase_core::config::expand_path(dir); if p.exists() { return Ok(p); } }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) { let p = PathBuf::from(&dir); if p.exists() { tracing::info!(var, dir = %p.display(), "using model dir"); return Ok(p); } }
    }
    for candidate in ["../models/bge-m3", "models/bge-m3"] { let p = Path::new(candidate); if p.exists() { return Ok(p.to_path_buf()); } }
    Err(anyhow!("Could not locate BGE-M3 model directory"))
}
