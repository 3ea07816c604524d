//! Minimal PDF ingestion: page-by-page text extraction plus a line-shape
//! heading heuristic. This is deliberately not a faithful layout
//! reconstruction (full PDF rendering and layout analysis are out of
//! scope) — its only job is to produce a [`ConvertedDocument`] the
//! chunker can walk.

use crate::error::{CoreError, Result};
use crate::types::{ConvertedDocument, ExtractedItem, Provenance};
use std::path::Path;

/// A bare line is treated as a heading when it reads like a section
/// title: short, capitalized or numbered, and not terminated like a
/// sentence.
fn looks_like_heading(line: &str) -> bool {
    let len = line.chars().count();
    if len == 0 || len > 80 {
        return false;
    }
    if line.ends_with('.') || line.ends_with(',') || line.ends_with(';') {
        return false;
    }
    line.chars()
        .next()
        .map(|c| c.is_uppercase() || c.is_numeric())
        .unwrap_or(false)
}

pub struct DocumentConverter;

impl DocumentConverter {
    pub fn convert_pdf(path: &Path) -> Result<ConvertedDocument> {
        let pages = pdf_extract::extract_text_by_pages(path).map_err(|e| CoreError::Ingestion {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut items = Vec::new();
        for (idx, page_text) in pages.iter().enumerate() {
            let page = (idx + 1) as u32;
            for raw_line in page_text.lines() {
                let line = raw_line.trim();
                if line.is_empty() {
                    continue;
                }
                let heading_level = looks_like_heading(line).then_some(1);
                items.push(ExtractedItem::TextItem {
                    text: line.to_string(),
                    heading_level,
                    prov: Provenance { page, bbox: None },
                });
            }
        }

        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled")
            .to_string();

        Ok(ConvertedDocument {
            title,
            page_count: pages.len() as u32,
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_accepts_short_titlecase_lines() {
        assert!(looks_like_heading("Malaria"));
        assert!(looks_like_heading("1. Overview"));
    }

    #[test]
    fn heuristic_rejects_sentences() {
        assert!(!looks_like_heading("Patients present with fever and chills."));
        assert!(!looks_like_heading(""));
    }

    #[test]
    fn missing_file_is_an_ingestion_error() {
        let result = DocumentConverter::convert_pdf(Path::new("/nonexistent/guidelines.pdf"));
        assert!(matches!(result, Err(CoreError::Ingestion { .. })));
    }
}
