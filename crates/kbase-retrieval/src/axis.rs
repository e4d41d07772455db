//! Cascading search along one axis.
//!
//! Tiers are tried in order. A tier is accepted as soon as it returns at least
//! one hit closer than the threshold; the last tier is returned as-is. A store
//! failure ends the axis instead of falling through to the next tier.

use std::sync::Arc;

use kbase_core::traits::VectorStore;
use kbase_core::types::{AxisConfig, SearchHit};
use kbase_core::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct AxisOutcome {
    pub hits: Vec<SearchHit>,
    /// Index into the axis' tier list of the tier whose hits were returned.
    pub tier_used: usize,
}

pub struct AxisSearcher {
    name: String,
    tiers: Vec<String>,
    threshold: f32,
    store: Arc<dyn VectorStore>,
}

impl AxisSearcher {
    pub fn new(name: impl Into<String>, tiers: Vec<String>, threshold: f32, store: Arc<dyn VectorStore>) -> Self {
        Self { name: name.into(), tiers, threshold, store }
    }

    /// Uses the axis' own threshold when it has one, else `default_threshold`.
    pub fn from_config(config: &AxisConfig, default_threshold: f32, store: Arc<dyn VectorStore>) -> Self {
        Self::new(
            config.name.clone(),
            config.tiers.clone(),
            config.threshold_override.unwrap_or(default_threshold),
            store,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tiers(&self) -> &[String] {
        &self.tiers
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub async fn search(&self, vector: &[f32], max_results: usize) -> Result<AxisOutcome> {
        if max_results == 0 {
            return Err(Error::InvalidArgument("max_results must be positive".to_string()));
        }
        if self.tiers.is_empty() {
            return Err(Error::InvalidArgument(format!("axis '{}' has no tiers", self.name)));
        }
        let last = self.tiers.len() - 1;
        for (tier, collection) in self.tiers.iter().enumerate() {
            let hits = self.query_tier(collection, vector, max_results).await?;
            if tier == last {
                tracing::debug!(axis = %self.name, tier, collection = %collection, hits = hits.len(), "last tier returned");
                return Ok(AxisOutcome { hits, tier_used: tier });
            }
            if hits.iter().any(|h| h.distance < self.threshold) {
                tracing::debug!(axis = %self.name, tier, collection = %collection, hits = hits.len(), threshold = self.threshold, "tier accepted");
                return Ok(AxisOutcome { hits, tier_used: tier });
            }
            tracing::debug!(axis = %self.name, tier, collection = %collection, hits = hits.len(), threshold = self.threshold, "no hit under threshold, falling through");
        }
        Ok(AxisOutcome { hits: Vec::new(), tier_used: last })
    }

    async fn query_tier(&self, collection: &str, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        match self.store.query_nearest(collection, vector, k).await {
            Ok(mut hits) => {
                hits.truncate(k);
                Ok(hits)
            }
            Err(e @ Error::DimensionMismatch { .. }) => Err(e),
            Err(e) => Err(Error::AxisQueryFailure {
                axis: self.name.clone(),
                collection: collection.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
