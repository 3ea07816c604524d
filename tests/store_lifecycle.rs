//! Exercises `CorpusStore::open` against a real on-disk path (not
//! `:memory:`), including the parent-directory creation path.

use chw_clinical_core::store::CorpusStore;
use chw_clinical_core::types::{ApprovalStatus, DocumentMetadata};

#[test]
fn open_creates_parent_directories_and_schema() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("nested").join("guidelines.db");

    let store = CorpusStore::open(&db_path).expect("open store at nested path");
    assert!(db_path.exists());

    let doc_id = store
        .insert_document(
            &DocumentMetadata {
                filename: "guidelines.pdf".into(),
                title: "Guidelines".into(),
                version: None,
                extraction_date: "2024-01-01".into(),
                page_count: 3,
            },
            None,
        )
        .expect("insert document");

    let fetched = store.get_document(&doc_id).expect("query document");
    assert!(fetched.is_some());
    assert_eq!(fetched.unwrap().approval_status, ApprovalStatus::Pending);
}

#[test]
fn reopening_an_existing_database_preserves_data() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("guidelines.db");

    let doc_id = {
        let store = CorpusStore::open(&db_path).expect("open store");
        store
            .insert_document(
                &DocumentMetadata {
                    filename: "a.pdf".into(),
                    title: "A".into(),
                    version: None,
                    extraction_date: "2024-01-01".into(),
                    page_count: 1,
                },
                None,
            )
            .expect("insert document")
    };

    let reopened = CorpusStore::open(&db_path).expect("reopen store");
    let fetched = reopened.get_document(&doc_id).expect("query document");
    assert!(fetched.is_some());
}
