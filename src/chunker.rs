//! Turns a [`ConvertedDocument`] into persistable [`ChunkRecord`]s: tracks
//! the heading hierarchy, groups body text into character-budgeted chunks,
//! and derives `content`/`metadata` category from the heading path alone.
//! Grounded in `original_source/extraction/src/chunker.py::GuidelineChunker`.

use crate::types::{BBox, ChunkCategory, ChunkRecord, ChunkType, ConvertedDocument, ExtractedItem};
use uuid::Uuid;

/// Case-insensitive substring patterns that mark a heading path as
/// front/back matter rather than clinical guidance (invariant I3).
const METADATA_HEADING_PATTERNS: &[&str] = &[
    "contents",
    "table of contents",
    "abbreviations",
    "acronyms",
    "foreword",
    "preface",
    "acknowledgements",
    "acknowledgments",
    "credits",
    "contributors",
    "editorial",
    "index",
    "glossary",
    "references",
    "bibliography",
];

fn determine_category(headings: &[String]) -> ChunkCategory {
    for heading in headings {
        let lower = heading.to_lowercase();
        let lower = lower.trim();
        if METADATA_HEADING_PATTERNS.iter().any(|p| lower.contains(p)) {
            return ChunkCategory::Metadata;
        }
    }
    ChunkCategory::Content
}

fn contextualize(headings: &[String], content: &str) -> String {
    if headings.is_empty() {
        content.to_string()
    } else {
        format!("[{}] {}", headings.join(" > "), content)
    }
}

pub struct GuidelineChunker {
    /// Character budget per body-text chunk. Not tokenizer-aware — the
    /// extraction boundary has no dependency on the embedder's tokenizer.
    pub max_chars: usize,
    pub merge_list_items: bool,
}

impl Default for GuidelineChunker {
    fn default() -> Self {
        Self {
            max_chars: 3000,
            merge_list_items: true,
        }
    }
}

#[derive(Default)]
struct Buffer {
    content: String,
    headings: Vec<String>,
    page_number: Option<u32>,
    bbox: Option<BBox>,
}

impl Buffer {
    fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl GuidelineChunker {
    pub fn new(max_chars: usize, merge_list_items: bool) -> Self {
        Self {
            max_chars,
            merge_list_items,
        }
    }

    pub fn chunk(&self, doc_id: &str, document: &ConvertedDocument) -> Vec<ChunkRecord> {
        let mut stack: Vec<String> = Vec::new();
        let mut out = Vec::new();
        let mut buffer = Buffer::default();

        for item in &document.items {
            match item {
                ExtractedItem::TextItem {
                    text,
                    heading_level: Some(level),
                    ..
                } => {
                    self.flush(doc_id, &mut buffer, &mut out);
                    let depth = (*level as usize).max(1) - 1;
                    stack.truncate(depth);
                    stack.push(text.clone());
                }
                ExtractedItem::TextItem {
                    text,
                    heading_level: None,
                    prov,
                } => {
                    if !buffer.is_empty() && buffer.content.len() + text.len() > self.max_chars {
                        self.flush(doc_id, &mut buffer, &mut out);
                    }
                    if buffer.is_empty() {
                        buffer.headings = stack.clone();
                        buffer.page_number = Some(prov.page);
                        buffer.bbox = prov.bbox.clone();
                    }
                    if !buffer.content.is_empty() {
                        buffer.content.push(' ');
                    }
                    buffer.content.push_str(text);
                }
                ExtractedItem::TableItem { text, prov } => {
                    self.flush(doc_id, &mut buffer, &mut out);
                    out.push(self.finalize(
                        doc_id,
                        text.clone(),
                        ChunkType::Table,
                        stack.clone(),
                        Some(prov.page),
                        prov.bbox.clone(),
                        "Table".to_string(),
                    ));
                }
                ExtractedItem::FigureItem { caption, prov } => {
                    self.flush(doc_id, &mut buffer, &mut out);
                    if let Some(caption) = caption {
                        out.push(self.finalize(
                            doc_id,
                            caption.clone(),
                            ChunkType::Figure,
                            stack.clone(),
                            Some(prov.page),
                            prov.bbox.clone(),
                            "Picture".to_string(),
                        ));
                    }
                }
                ExtractedItem::ListItem { items, prov } => {
                    self.flush(doc_id, &mut buffer, &mut out);
                    if self.merge_list_items {
                        out.push(self.finalize(
                            doc_id,
                            items.join("\n"),
                            ChunkType::List,
                            stack.clone(),
                            Some(prov.page),
                            prov.bbox.clone(),
                            "ListItem".to_string(),
                        ));
                    } else {
                        for entry in items {
                            out.push(self.finalize(
                                doc_id,
                                entry.clone(),
                                ChunkType::List,
                                stack.clone(),
                                Some(prov.page),
                                prov.bbox.clone(),
                                "ListItem".to_string(),
                            ));
                        }
                    }
                }
            }
        }
        self.flush(doc_id, &mut buffer, &mut out);
        out
    }

    fn flush(&self, doc_id: &str, buffer: &mut Buffer, out: &mut Vec<ChunkRecord>) {
        if buffer.is_empty() {
            return;
        }
        let taken = std::mem::take(buffer);
        out.push(self.finalize(
            doc_id,
            taken.content,
            ChunkType::Text,
            taken.headings,
            taken.page_number,
            taken.bbox,
            "Text".to_string(),
        ));
    }

    fn finalize(
        &self,
        doc_id: &str,
        content: String,
        chunk_type: ChunkType,
        headings: Vec<String>,
        page_number: Option<u32>,
        bbox: Option<BBox>,
        element_label: String,
    ) -> ChunkRecord {
        let category = determine_category(&headings);
        let contextualized_text = contextualize(&headings, &content);
        ChunkRecord {
            chunk_id: Uuid::new_v4().to_string(),
            doc_id: doc_id.to_string(),
            content,
            contextualized_text,
            chunk_type,
            page_number,
            category,
            headings,
            bbox,
            element_label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Provenance;

    fn prov(page: u32) -> Provenance {
        Provenance { page, bbox: None }
    }

    #[test]
    fn heading_path_flags_metadata_sections() {
        let doc = ConvertedDocument {
            title: "Guidelines".into(),
            page_count: 2,
            items: vec![
                ExtractedItem::TextItem {
                    text: "Table of Contents".into(),
                    heading_level: Some(1),
                    prov: prov(1),
                },
                ExtractedItem::TextItem {
                    text: "1. Malaria ... 4".into(),
                    heading_level: None,
                    prov: prov(1),
                },
                ExtractedItem::TextItem {
                    text: "Malaria".into(),
                    heading_level: Some(1),
                    prov: prov(2),
                },
                ExtractedItem::TextItem {
                    text: "Malaria presents with fever and chills.".into(),
                    heading_level: None,
                    prov: prov(2),
                },
            ],
        };
        let chunker = GuidelineChunker::default();
        let chunks = chunker.chunk("doc1", &doc);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].category, ChunkCategory::Metadata);
        assert_eq!(chunks[1].category, ChunkCategory::Content);
        assert_eq!(chunks[1].headings, vec!["Malaria".to_string()]);
    }

    #[test]
    fn nested_headings_reset_on_shallower_sibling() {
        let doc = ConvertedDocument {
            title: "Guidelines".into(),
            page_count: 1,
            items: vec![
                ExtractedItem::TextItem {
                    text: "Malaria".into(),
                    heading_level: Some(1),
                    prov: prov(1),
                },
                ExtractedItem::TextItem {
                    text: "Diagnosis".into(),
                    heading_level: Some(2),
                    prov: prov(1),
                },
                ExtractedItem::TextItem {
                    text: "Use rapid diagnostic tests.".into(),
                    heading_level: None,
                    prov: prov(1),
                },
                ExtractedItem::TextItem {
                    text: "Dehydration".into(),
                    heading_level: Some(1),
                    prov: prov(2),
                },
                ExtractedItem::TextItem {
                    text: "Give oral rehydration salts.".into(),
                    heading_level: None,
                    prov: prov(2),
                },
            ],
        };
        let chunks = GuidelineChunker::default().chunk("doc1", &doc);
        assert_eq!(chunks.len(), 2);
        assert_eq!(
            chunks[0].headings,
            vec!["Malaria".to_string(), "Diagnosis".to_string()]
        );
        assert_eq!(chunks[1].headings, vec!["Dehydration".to_string()]);
    }

    #[test]
    fn contextualized_text_prefixes_heading_path() {
        let doc = ConvertedDocument {
            title: "Guidelines".into(),
            page_count: 1,
            items: vec![
                ExtractedItem::TextItem {
                    text: "Malaria".into(),
                    heading_level: Some(1),
                    prov: prov(1),
                },
                ExtractedItem::TextItem {
                    text: "Fever is a key symptom.".into(),
                    heading_level: None,
                    prov: prov(1),
                },
            ],
        };
        let chunks = GuidelineChunker::default().chunk("doc1", &doc);
        assert_eq!(
            chunks[0].contextualized_text,
            "[Malaria] Fever is a key symptom."
        );
    }

    #[test]
    fn figure_without_caption_is_dropped() {
        let doc = ConvertedDocument {
            title: "Guidelines".into(),
            page_count: 1,
            items: vec![ExtractedItem::FigureItem {
                caption: None,
                prov: prov(1),
            }],
        };
        let chunks = GuidelineChunker::default().chunk("doc1", &doc);
        assert!(chunks.is_empty());
    }

    #[test]
    fn list_items_merge_into_single_chunk() {
        let doc = ConvertedDocument {
            title: "Guidelines".into(),
            page_count: 1,
            items: vec![ExtractedItem::ListItem {
                items: vec!["Fever".into(), "Chills".into(), "Headache".into()],
                prov: prov(1),
            }],
        };
        let chunks = GuidelineChunker::default().chunk("doc1", &doc);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Fever\nChills\nHeadache");
    }
}
