//! `RetrievalEngine`: embed, search every axis concurrently, merge, reconstruct.
//!
//! The whole call runs under one deadline. When it expires the in-flight axis
//! queries and document fetches are dropped and nothing partial is returned.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::Serialize;

use kbase_core::config::Settings;
use kbase_core::traits::{EmbeddingProvider, VectorStore};
use kbase_core::types::{AxisConfig, Document, ReconstructedAnswer, SearchHit};
use kbase_core::{Error, Result};

use crate::axis::AxisSearcher;
use crate::merge::merge;
use crate::query::QueryProcessor;
use crate::reconstruct::DocumentReconstructor;
use crate::stats::{SearchMetrics, SearchStats};

/// Post-reconstruction filter on document attributes. `None` matches anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentFilter {
    pub source_type: Option<String>,
    pub language: Option<String>,
}

impl DocumentFilter {
    pub fn is_empty(&self) -> bool {
        self.source_type.is_none() && self.language.is_none()
    }

    pub fn matches(&self, doc: &Document) -> bool {
        let field_ok = |want: &Option<String>, have: &Option<String>| want.is_none() || want == have;
        field_ok(&self.source_type, &doc.source_type) && field_ok(&self.language, &doc.language)
    }
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub axes: Vec<AxisConfig>,
    pub max_per_axis: usize,
    pub max_total: usize,
    /// Default cascade threshold, used by axes without an override.
    pub threshold: f32,
    pub timeout: Duration,
    pub fetch_concurrency: usize,
    pub filter: DocumentFilter,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl SearchOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        let s = &settings.search;
        Self {
            axes: settings.axes.clone(),
            max_per_axis: s.max_per_axis,
            max_total: s.max_total,
            threshold: s.threshold,
            timeout: Duration::from_millis(s.timeout_ms),
            fetch_concurrency: s.fetch_concurrency,
            filter: DocumentFilter::default(),
        }
    }

    pub fn with_axes(mut self, axes: Vec<AxisConfig>) -> Self {
        self.axes = axes;
        self
    }

    pub fn with_filter(mut self, filter: DocumentFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_per_axis == 0 {
            return Err(Error::InvalidArgument("max_per_axis must be positive".to_string()));
        }
        if self.max_total == 0 {
            return Err(Error::InvalidArgument("max_total must be positive".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(Error::InvalidArgument("timeout must be positive".to_string()));
        }
        check_threshold("threshold", self.threshold)?;
        let mut seen = HashSet::new();
        for axis in &self.axes {
            if !seen.insert(axis.name.as_str()) {
                return Err(Error::InvalidArgument(format!("axis '{}' is configured twice", axis.name)));
            }
            if axis.tiers.is_empty() {
                return Err(Error::InvalidArgument(format!("axis '{}' has no tiers", axis.name)));
            }
            if let Some(t) = axis.threshold_override {
                check_threshold(&format!("threshold of axis '{}'", axis.name), t)?;
            }
        }
        Ok(())
    }
}

fn check_threshold(what: &str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!("{} must be a non-negative number, got {}", what, value)))
    }
}

/// How one axis fared during a search.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AxisReport {
    pub axis: String,
    pub tier_used: Option<usize>,
    pub collection: Option<String>,
    pub hits: usize,
    pub failure: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub answers: Vec<ReconstructedAnswer>,
    pub dropped_count: usize,
    /// Answers removed by `SearchOptions::filter`.
    pub filtered_count: usize,
    pub axes: Vec<AxisReport>,
    pub elapsed: Duration,
}

impl SearchResponse {
    /// True when at least one axis failed but the search still succeeded.
    pub fn is_partial(&self) -> bool {
        self.axes.iter().any(|a| a.failure.is_some())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub axis: String,
    pub collection: String,
    pub records: Option<usize>,
    pub error: Option<String>,
}

/// Health and configuration snapshot of an engine.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub store_reachable: bool,
    pub store_error: Option<String>,
    pub embedder_id: String,
    pub dim: usize,
    pub threshold: f32,
    pub max_total: usize,
    pub axes: Vec<String>,
    pub stats: SearchStats,
}

pub struct RetrievalEngine {
    query: QueryProcessor,
    store: Arc<dyn VectorStore>,
    metrics: SearchMetrics,
}

impl RetrievalEngine {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { query: QueryProcessor::new(provider), store, metrics: SearchMetrics::new() }
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        self.query.provider()
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn stats(&self) -> SearchStats {
        self.metrics.snapshot()
    }

    /// Every call counts towards `stats()`, including rejected and failed ones.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse> {
        let started = Instant::now();
        let result = self.search_within_deadline(query, options, started).await;
        self.metrics.record(started.elapsed(), result.is_ok());
        result
    }

    async fn search_within_deadline(&self, query: &str, options: &SearchOptions, started: Instant) -> Result<SearchResponse> {
        options.validate()?;
        tracing::info!(axes = options.axes.len(), max_total = options.max_total, "search started");
        match tokio::time::timeout(options.timeout, self.run(query, options, started)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout_ms = options.timeout.as_millis() as u64, "search deadline exceeded");
                Err(Error::DeadlineExceeded(options.timeout))
            }
        }
    }

    async fn run(&self, query: &str, options: &SearchOptions, started: Instant) -> Result<SearchResponse> {
        let vector = self.query.embed_query(query).await?;
        if options.axes.is_empty() {
            return Ok(SearchResponse {
                answers: Vec::new(),
                dropped_count: 0,
                filtered_count: 0,
                axes: Vec::new(),
                elapsed: started.elapsed(),
            });
        }

        let searchers: Vec<AxisSearcher> = options
            .axes
            .iter()
            .map(|axis| AxisSearcher::from_config(axis, options.threshold, self.store.clone()))
            .collect();
        let outcomes = join_all(searchers.iter().map(|s| s.search(&vector, options.max_per_axis))).await;

        let mut reports = Vec::with_capacity(searchers.len());
        let mut axis_hits: Vec<(&str, Vec<SearchHit>)> = Vec::with_capacity(searchers.len());
        for (searcher, outcome) in searchers.iter().zip(outcomes) {
            match outcome {
                Ok(outcome) => {
                    reports.push(AxisReport {
                        axis: searcher.name().to_string(),
                        tier_used: Some(outcome.tier_used),
                        collection: searcher.tiers().get(outcome.tier_used).cloned(),
                        hits: outcome.hits.len(),
                        failure: None,
                    });
                    axis_hits.push((searcher.name(), outcome.hits));
                }
                Err(e @ Error::DimensionMismatch { .. }) => {
                    tracing::error!(axis = %searcher.name(), error = %e, "query vector does not fit collection");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(axis = %searcher.name(), error = %e, "axis failed, continuing without it");
                    reports.push(AxisReport {
                        axis: searcher.name().to_string(),
                        tier_used: None,
                        collection: None,
                        hits: 0,
                        failure: Some(e.to_string()),
                    });
                }
            }
        }
        if axis_hits.is_empty() {
            tracing::error!(axes = searchers.len(), "every axis failed");
            return Err(Error::AllAxesFailed(searchers.len()));
        }

        let merged = merge(&axis_hits, options.max_total);
        let reconstructed = DocumentReconstructor::new(self.store.clone(), options.fetch_concurrency)
            .reconstruct(&merged)
            .await;
        let mut answers = reconstructed.answers;
        let before = answers.len();
        if !options.filter.is_empty() {
            answers.retain(|a| options.filter.matches(&a.document));
            tracing::debug!(kept = answers.len(), removed = before - answers.len(), "filter applied");
        }
        let response = SearchResponse {
            filtered_count: before - answers.len(),
            answers,
            dropped_count: reconstructed.dropped_count,
            axes: reports,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            answers = response.answers.len(),
            dropped = response.dropped_count,
            filtered = response.filtered_count,
            elapsed_ms = response.elapsed.as_millis() as u64,
            "search finished"
        );
        Ok(response)
    }

    /// Every tier collection must exist and match the provider's dimensionality.
    pub async fn validate(&self, axes: &[AxisConfig]) -> Result<()> {
        let dim = self.provider().dim();
        for axis in axes {
            for collection in &axis.tiers {
                match self.store.collection_dim(collection).await? {
                    Some(expected) if expected != dim => {
                        return Err(Error::DimensionMismatch { collection: collection.clone(), expected, actual: dim });
                    }
                    Some(_) => {}
                    None => tracing::warn!(axis = %axis.name, collection = %collection, "collection is empty"),
                }
            }
        }
        tracing::info!(axes = axes.len(), dim, "axes validated");
        Ok(())
    }

    /// Record counts per tier. Failures are reported per tier, not raised.
    pub async fn collection_stats(&self, axes: &[AxisConfig]) -> Vec<CollectionStats> {
        let mut stats = Vec::new();
        for axis in axes {
            for collection in &axis.tiers {
                let (records, error) = match self.store.count_records(collection).await {
                    Ok(n) => (Some(n), None),
                    Err(e) => (None, Some(e.to_string())),
                };
                stats.push(CollectionStats { axis: axis.name.clone(), collection: collection.clone(), records, error });
            }
        }
        stats
    }

    /// Store reachability, provider identity, the given options and running totals.
    pub async fn status(&self, options: &SearchOptions) -> EngineStatus {
        let store_error = match self.store.ping().await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(error = %e, "store unreachable");
                Some(e.to_string())
            }
        };
        EngineStatus {
            store_reachable: store_error.is_none(),
            store_error,
            embedder_id: self.provider().embedder_id().to_string(),
            dim: self.provider().dim(),
            threshold: options.threshold,
            max_total: options.max_total,
            axes: options.axes.iter().map(|a| a.name.clone()).collect(),
            stats: self.metrics.snapshot(),
        }
    }
}
