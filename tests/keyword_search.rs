//! Integration tests mirroring
//! `original_source/extraction/tests/test_search.py::TestKeywordSearch`,
//! against an in-memory store with the same five fixture chunks.

use chw_clinical_core::store::CorpusStore;
use chw_clinical_core::types::{ChunkCategory, ChunkRecord, ChunkType, DocumentMetadata};

fn mock_store() -> CorpusStore {
    let store = CorpusStore::in_memory().expect("open in-memory store");
    let doc_id = store
        .insert_document(
            &DocumentMetadata {
                filename: "test.pdf".into(),
                title: "Test Guidelines".into(),
                version: Some("1.0".into()),
                extraction_date: "2024-01-01".into(),
                page_count: 10,
            },
            None,
        )
        .expect("insert document");

    let fixtures = [
        (
            "c1",
            "Malaria danger signs in children under 5: convulsions, inability to drink, \
             severe vomiting, high fever above 39C. Refer immediately.",
            5u32,
            ChunkCategory::Content,
            vec!["Chapter 3", "Malaria", "Danger Signs"],
        ),
        (
            "c2",
            "Treatment of uncomplicated malaria: Artemether-Lumefantrine (AL) is the \
             first-line treatment. Dosage by weight.",
            6,
            ChunkCategory::Content,
            vec!["Chapter 3", "Malaria", "Treatment"],
        ),
        (
            "c3",
            "Management of severe dehydration: Start IV fluids immediately. Ringer's \
             Lactate or Normal Saline.",
            12,
            ChunkCategory::Content,
            vec!["Chapter 5", "Dehydration", "Management"],
        ),
        (
            "c4",
            "Headache management: Paracetamol 500mg-1g every 4-6 hours. Maximum 4g per day.",
            20,
            ChunkCategory::Content,
            vec!["Chapter 8", "Neurological", "Headache"],
        ),
        (
            "c5",
            "Table of Contents: Chapter 1 Introduction, Chapter 2 Emergencies, Chapter 3 Malaria",
            1,
            ChunkCategory::Metadata,
            vec!["Contents"],
        ),
    ];

    for (id, content, page, category, headings) in fixtures {
        let headings: Vec<String> = headings.into_iter().map(String::from).collect();
        store
            .insert_chunk(
                &doc_id,
                &ChunkRecord {
                    chunk_id: id.to_string(),
                    doc_id: doc_id.clone(),
                    content: content.to_string(),
                    contextualized_text: format!("[{}] {}", headings.join(" > "), content),
                    chunk_type: ChunkType::Text,
                    page_number: Some(page),
                    category,
                    headings,
                    bbox: None,
                    element_label: String::new(),
                },
            )
            .expect("insert chunk");
    }

    store.populate_fts().expect("populate fts");
    store
}

fn fts(q: &str) -> String {
    q.split_whitespace()
        .map(|t| format!("\"{t}\""))
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn returns_results_for_known_query() {
    let store = mock_store();
    let results = store.bm25_search(&fts("malaria danger signs"), 5).unwrap();
    assert!(!results.is_empty());
}

#[test]
fn malaria_query_finds_malaria_chunk() {
    let store = mock_store();
    let results = store.bm25_search(&fts("malaria"), 5).unwrap();
    assert!(results.iter().any(|r| r.content.to_lowercase().contains("malaria")));
}

#[test]
fn dehydration_query_finds_dehydration_chunk() {
    let store = mock_store();
    let results = store.bm25_search(&fts("severe dehydration treatment"), 5).unwrap();
    assert!(results.iter().any(|r| r.content.to_lowercase().contains("dehydration")));
}

#[test]
fn metadata_chunks_are_excluded_from_keyword_search() {
    let store = mock_store();
    let results = store.bm25_search(&fts("malaria"), 10).unwrap();
    assert!(results.iter().all(|r| r.chunk_id != "c5"));
}

#[test]
fn results_have_headings() {
    let store = mock_store();
    let results = store.bm25_search(&fts("malaria"), 5).unwrap();
    assert!(!results.is_empty());
    assert!(!results[0].headings.is_empty());
}
