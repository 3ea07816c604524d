//! Schema DDL for the embedded store. Mirrors
//! `original_source/extraction/src/database.py::GuidelineDatabase.SCHEMA_SQL`.

pub const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS documents (
    doc_id TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    title TEXT,
    version TEXT,
    extraction_date TEXT NOT NULL,
    approval_status TEXT DEFAULT 'pending',
    docling_json TEXT,
    page_count INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS chunks (
    chunk_id TEXT PRIMARY KEY,
    doc_id TEXT NOT NULL,
    content TEXT NOT NULL,
    contextualized_text TEXT NOT NULL,
    chunk_type TEXT NOT NULL,
    page_number INTEGER,
    category TEXT DEFAULT 'content',
    FOREIGN KEY (doc_id) REFERENCES documents(doc_id)
);

CREATE INDEX IF NOT EXISTS idx_chunks_category ON chunks(category);
CREATE INDEX IF NOT EXISTS idx_chunks_doc_id ON chunks(doc_id);
CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(approval_status);

CREATE TABLE IF NOT EXISTS chunk_metadata (
    chunk_id TEXT PRIMARY KEY,
    headings_json TEXT,
    bbox_json TEXT,
    element_label TEXT,
    FOREIGN KEY (chunk_id) REFERENCES chunks(chunk_id)
);

CREATE TABLE IF NOT EXISTS high_risk_terms (
    term_id INTEGER PRIMARY KEY AUTOINCREMENT,
    term TEXT NOT NULL UNIQUE,
    category TEXT,
    severity TEXT DEFAULT 'High'
);
";

/// Stands in for the `vec0` virtual table named in the external interface.
/// `sqlite-vec` is a loadable C extension, not a fetchable Rust crate, so
/// the vector column is a plain BLOB of little-endian f32s and the nearest
/// -neighbor scan runs in Rust (the Vector Index contract explicitly
/// permits brute force for smaller corpora). See DESIGN.md.
pub const EMBEDDINGS_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS embeddings (
    chunk_id TEXT PRIMARY KEY,
    embedding BLOB NOT NULL,
    FOREIGN KEY (chunk_id) REFERENCES chunks(chunk_id)
);
";

pub const FTS5_TABLE_SQL: &str = "
CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts USING fts5(
    chunk_id UNINDEXED,
    content,
    tokenize='porter unicode61'
);
";
