//! Hierarchical semantic retrieval over tiered vector collections.
//!
//! A query is embedded once, searched along every configured axis in
//! parallel (each axis cascading through its tiers), merged into one ranked
//! list with one entry per document and expanded into full documents.

pub mod axis;
pub mod engine;
pub mod merge;
pub mod query;
pub mod reconstruct;
pub mod stats;

pub use axis::{AxisOutcome, AxisSearcher};
pub use engine::{AxisReport, CollectionStats, DocumentFilter, EngineStatus, RetrievalEngine, SearchOptions, SearchResponse};
pub use merge::merge;
pub use query::QueryProcessor;
pub use reconstruct::{DocumentReconstructor, Reconstruction};
pub use stats::{SearchMetrics, SearchStats};
