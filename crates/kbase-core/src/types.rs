//! Domain types shared by the embedding, vector and retrieval crates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;

pub type DocumentId = String;
pub type RecordId = String;
/// Free-form record metadata, passed through untouched. Values keep their JSON type.
pub type Meta = HashMap<String, serde_json::Value>;
pub type Vector = Vec<f32>;

/// Metadata key under which ingestion stores the section a record was derived from.
pub const SECTION_TYPE_KEY: &str = "section_type";

/// Named text blocks produced by upstream summarization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    CoreContent,
    DetailedContent,
    MainTopics,
    SubTopics,
    RawContent,
    TableOfContents,
}

impl SectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::CoreContent => "core_content",
            SectionType::DetailedContent => "detailed_content",
            SectionType::MainTopics => "main_topics",
            SectionType::SubTopics => "sub_topics",
            SectionType::RawContent => "raw_content",
            SectionType::TableOfContents => "table_of_contents",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Sections {
    #[serde(default)]
    pub core_content: String,
    #[serde(default)]
    pub detailed_content: String,
    #[serde(default)]
    pub main_topics: String,
    #[serde(default)]
    pub sub_topics: String,
    #[serde(default)]
    pub raw_content: String,
    #[serde(default)]
    pub table_of_contents: Option<String>,
    #[serde(default)]
    pub child_document_ids: Vec<DocumentId>,
}

impl Sections {
    pub fn get(&self, section: SectionType) -> Option<&str> {
        let text = match section {
            SectionType::CoreContent => &self.core_content,
            SectionType::DetailedContent => &self.detailed_content,
            SectionType::MainTopics => &self.main_topics,
            SectionType::SubTopics => &self.sub_topics,
            SectionType::RawContent => &self.raw_content,
            SectionType::TableOfContents => return self.table_of_contents.as_deref(),
        };
        if text.is_empty() { None } else { Some(text.as_str()) }
    }
}

/// The unit of retrievable knowledge. Read-only from the engine's perspective.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    #[serde(default)]
    pub sections: Sections,
    /// Origin of the document (e.g. `pdf`, `web`), used by search filters.
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default, alias = "document_language")]
    pub language: Option<String>,
}

impl Document {
    pub fn new(id: impl Into<DocumentId>, title: impl Into<String>, sections: Sections) -> Self {
        Self { id: id.into(), title: title.into(), sections, source_type: None, language: None }
    }
}

/// One vector derived from one section of one document.
///
/// `id` conventionally follows `{document_id}_{section_type}_{variant}`; all
/// records in one collection share the same dimensionality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: RecordId,
    pub document_id: DocumentId,
    pub vector: Vector,
    #[serde(default)]
    pub metadata: Meta,
}

impl EmbeddingRecord {
    pub fn conventional_id(document_id: &str, section: SectionType, variant: &str) -> RecordId {
        format!("{}_{}_{}", document_id, section.as_str(), variant)
    }
}

/// One nearest-neighbour result.
///
/// `distance` is non-negative, 0 means identical. Its range depends on the
/// store's metric. `collection` names the tier that produced the hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub record_id: RecordId,
    pub document_id: DocumentId,
    pub distance: f32,
    pub collection: String,
    #[serde(default)]
    pub metadata: Meta,
}

/// A hit that survived cross-axis deduplication, tagged with the winning axis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergedHit {
    pub record_id: RecordId,
    pub document_id: DocumentId,
    pub distance: f32,
    pub collection: String,
    pub metadata: Meta,
    pub axis: String,
}

impl MergedHit {
    pub fn from_hit(hit: SearchHit, axis: &str) -> Self {
        Self {
            record_id: hit.record_id,
            document_id: hit.document_id,
            distance: hit.distance,
            collection: hit.collection,
            metadata: hit.metadata,
            axis: axis.to_string(),
        }
    }

    /// Section the hit matched: the record's `section_type` metadata, else the tier collection.
    pub fn matched_section_type(&self) -> &str {
        self.metadata
            .get(SECTION_TYPE_KEY)
            .and_then(serde_json::Value::as_str)
            .unwrap_or(&self.collection)
    }
}

/// Display-ready answer produced by reconstruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconstructedAnswer {
    pub document: Document,
    pub distance: f32,
    pub axis: String,
    pub matched_section_type: String,
}

impl ReconstructedAnswer {
    pub fn to_markdown(&self) -> String {
        let doc = &self.document;
        let mut out = String::new();
        let _ = writeln!(out, "## {}", doc.title);
        let _ = writeln!(out);
        let _ = writeln!(out, "- id: {}", doc.id);
        let _ = writeln!(out, "- distance: {:.4}", self.distance);
        let _ = writeln!(out, "- axis: {}", self.axis);
        let _ = writeln!(out, "- matched_section: {}", self.matched_section_type);
        if let Some(source) = &doc.source_type {
            let _ = writeln!(out, "- source: {}", source);
        }
        if let Some(lang) = &doc.language {
            let _ = writeln!(out, "- language: {}", lang);
        }
        for (heading, section) in [
            ("Core content", SectionType::CoreContent),
            ("Detailed content", SectionType::DetailedContent),
            ("Main topics", SectionType::MainTopics),
            ("Sub topics", SectionType::SubTopics),
        ] {
            if let Some(text) = doc.sections.get(section) {
                let _ = writeln!(out);
                let _ = writeln!(out, "### {}", heading);
                let _ = writeln!(out);
                let _ = writeln!(out, "{}", text.trim_end());
            }
        }
        if !doc.sections.child_document_ids.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "### Children");
            let _ = writeln!(out);
            for child in &doc.sections.child_document_ids {
                let _ = writeln!(out, "- {}", child);
            }
        }
        out
    }
}

/// One semantic projection of the corpus: an ordered tier list, cheapest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AxisConfig {
    pub name: String,
    pub tiers: Vec<String>,
    #[serde(default)]
    pub threshold_override: Option<f32>,
}

impl AxisConfig {
    pub fn new<S: Into<String>>(name: S, tiers: &[&str]) -> Self {
        Self {
            name: name.into(),
            tiers: tiers.iter().map(|t| (*t).to_string()).collect(),
            threshold_override: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold_override = Some(threshold);
        self
    }
}
