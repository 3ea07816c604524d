//! Core data types shared across the store, retriever, alerter and
//! synthesis components.

use serde::{Deserialize, Serialize};

pub const EMBEDDING_DIM: usize = 384;

/// Lifecycle state of a [`Document`]. The only field mutated post-ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ApprovalStatus::Pending),
            "approved" => Some(ApprovalStatus::Approved),
            "rejected" => Some(ApprovalStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub filename: String,
    pub title: String,
    pub version: Option<String>,
    pub extraction_date: String,
    pub page_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: String,
    pub filename: String,
    pub title: String,
    pub version: Option<String>,
    pub extraction_date: String,
    pub approval_status: ApprovalStatus,
    pub raw_payload: Option<String>,
    pub page_count: u32,
}

/// Content kind of a chunk, derived from the extraction item that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    Text,
    Table,
    List,
    Figure,
}

impl ChunkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::Text => "text",
            ChunkType::Table => "table",
            ChunkType::List => "list",
            ChunkType::Figure => "figure",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "table" => ChunkType::Table,
            "list" => ChunkType::List,
            "figure" => ChunkType::Figure,
            _ => ChunkType::Text,
        }
    }
}

/// `content` for clinical guidance, `metadata` for front/back matter
/// (table of contents, abbreviations, references, ...). Derived purely
/// from `headings` — never user-set (invariant I3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkCategory {
    Content,
    Metadata,
}

impl ChunkCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkCategory::Content => "content",
            ChunkCategory::Metadata => "metadata",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "metadata" => ChunkCategory::Metadata,
            _ => ChunkCategory::Content,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

/// A persisted, immutable-after-ingestion passage of a guideline document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub doc_id: String,
    pub content: String,
    /// Content prefixed with its heading path; the canonical embedding input (I4).
    pub contextualized_text: String,
    pub chunk_type: ChunkType,
    pub page_number: Option<u32>,
    pub category: ChunkCategory,
    pub headings: Vec<String>,
    pub bbox: Option<BBox>,
    pub element_label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Severity {
    High,
    Medium,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "High",
            Severity::Medium => "Medium",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "High" => Severity::High,
            _ => Severity::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighRiskTermDef {
    pub term: &'static str,
    pub category: &'static str,
    pub severity: Severity,
}

/// Which lane(s) produced a [`SearchResult`]. Spec §9's "polymorphic
/// search sources" design note: a single tagged enum, not three types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Vector,
    Keyword,
    Hybrid,
}

/// Transient result produced by the retriever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk_id: String,
    pub content: String,
    pub headings: Vec<String>,
    pub page_number: Option<u32>,
    /// Larger is better, regardless of source.
    pub score: f32,
    pub source: Source,
}

/// A deduplicated mention of a high-risk term across a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighRiskAlert {
    pub term: String,
    pub category: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timings {
    pub search_ms: f64,
    pub synth_ms: f64,
    pub total_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub query: String,
    pub summary: String,
    pub chunks_used: Vec<SearchResult>,
    pub alerts: Vec<HighRiskAlert>,
    pub guardrail_passed: Option<bool>,
    pub guardrail_text: Option<String>,
    pub timings: Timings,
}

// --- Extraction boundary (§9 redesign note: tagged variant, not duck typing) ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    pub page: u32,
    pub bbox: Option<BBox>,
}

/// The sole shape the chunker consumes. Replaces attribute-presence
/// probing over a third-party conversion library's native document tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExtractedItem {
    TextItem {
        text: String,
        /// `Some(n)` marks this item as a heading at depth `n` (1-based,
        /// root shallowest); `None` means body text.
        heading_level: Option<u8>,
        prov: Provenance,
    },
    TableItem {
        text: String,
        prov: Provenance,
    },
    FigureItem {
        caption: Option<String>,
        prov: Provenance,
    },
    ListItem {
        items: Vec<String>,
        prov: Provenance,
    },
}

impl ExtractedItem {
    pub fn prov(&self) -> &Provenance {
        match self {
            ExtractedItem::TextItem { prov, .. }
            | ExtractedItem::TableItem { prov, .. }
            | ExtractedItem::FigureItem { prov, .. }
            | ExtractedItem::ListItem { prov, .. } => prov,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertedDocument {
    pub title: String,
    pub page_count: u32,
    pub items: Vec<ExtractedItem>,
}
