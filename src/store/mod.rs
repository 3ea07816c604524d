//! The Corpus Store: durable storage of documents, chunks, embeddings, the
//! full-text index and the high-risk lexicon in a single embedded SQLite
//! file. Single-writer, many-reader; writes to a chunk (content row,
//! metadata row, embedding, FTS entry) are committed atomically or not at
//! all. Grounded in `original_source/extraction/src/database.py`.

mod schema;

use crate::error::{CoreError, Result};
use crate::types::{
    ApprovalStatus, BBox, ChunkCategory, ChunkRecord, ChunkType, Document, DocumentMetadata,
    HighRiskTermDef, Severity, EMBEDDING_DIM,
};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// A chunk row returned by the vector or lexical index, before RRF fusion.
#[derive(Debug, Clone)]
pub struct ChunkHit {
    pub chunk_id: String,
    pub content: String,
    pub page_number: Option<u32>,
    pub category: ChunkCategory,
    pub headings: Vec<String>,
    /// Vector hits: cosine distance (smaller is better).
    /// Keyword hits: raw `bm25()` score (already negative; caller takes `abs`).
    pub raw_score: f32,
}

fn vector_to_blob(v: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(v.len() * 4);
    for x in v {
        out.extend_from_slice(&x.to_le_bytes());
    }
    out
}

fn blob_to_vector(b: &[u8]) -> Vec<f32> {
    b.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - (dot / (norm_a * norm_b))
}

#[derive(Clone)]
pub struct CorpusStore {
    conn: Arc<Mutex<Connection>>,
}

impl CorpusStore {
    /// Opens or creates the store at `path`, running schema creation
    /// idempotently. Pass `:memory:` for an ephemeral in-process store
    /// (used by integration tests).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path != Path::new(":memory:") {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(schema::SCHEMA_SQL)?;
        conn.execute(schema::EMBEDDINGS_TABLE_SQL, [])?;
        conn.execute(schema::FTS5_TABLE_SQL, [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    pub fn insert_document(
        &self,
        metadata: &DocumentMetadata,
        raw_payload: Option<&str>,
    ) -> Result<String> {
        let doc_id = Uuid::new_v4().to_string();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO documents (
                doc_id, filename, title, version,
                extraction_date, approval_status, docling_json, page_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7)",
            params![
                doc_id,
                metadata.filename,
                metadata.title,
                metadata.version,
                metadata.extraction_date,
                raw_payload,
                metadata.page_count,
            ],
        )?;
        Ok(doc_id)
    }

    pub fn insert_chunk(&self, doc_id: &str, chunk: &ChunkRecord) -> Result<()> {
        let mut conn = self.conn.lock();
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM documents WHERE doc_id = ?1",
                params![doc_id],
                |r| r.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(CoreError::Ingestion {
                path: doc_id.to_string(),
                reason: "referenced document does not exist".to_string(),
            });
        }

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO chunks (
                chunk_id, doc_id, content, contextualized_text,
                chunk_type, page_number, category
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                chunk.chunk_id,
                doc_id,
                chunk.content,
                chunk.contextualized_text,
                chunk.chunk_type.as_str(),
                chunk.page_number,
                chunk.category.as_str(),
            ],
        )?;
        let headings_json = serde_json::to_string(&chunk.headings).unwrap_or_default();
        let bbox_json = chunk.bbox.as_ref().map(|b| serde_json::to_string(b).unwrap_or_default());
        tx.execute(
            "INSERT INTO chunk_metadata (
                chunk_id, headings_json, bbox_json, element_label
            ) VALUES (?1, ?2, ?3, ?4)",
            params![chunk.chunk_id, headings_json, bbox_json, chunk.element_label],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn insert_embedding(&self, chunk_id: &str, vector: &[f32]) -> Result<()> {
        if vector.len() != EMBEDDING_DIM {
            return Err(CoreError::Configuration(format!(
                "embedding dimension mismatch: expected {EMBEDDING_DIM}, got {}",
                vector.len()
            )));
        }
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO embeddings(chunk_id, embedding) VALUES (?1, ?2)",
            params![chunk_id, vector_to_blob(vector)],
        )?;
        Ok(())
    }

    pub fn insert_embeddings_batch(&self, embeddings: &[(String, Vec<f32>)]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for (chunk_id, vector) in embeddings {
            if vector.len() != EMBEDDING_DIM {
                return Err(CoreError::Configuration(format!(
                    "embedding dimension mismatch: expected {EMBEDDING_DIM}, got {}",
                    vector.len()
                )));
            }
            tx.execute(
                "INSERT INTO embeddings(chunk_id, embedding) VALUES (?1, ?2)",
                params![chunk_id, vector_to_blob(vector)],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Atomically clears and rebuilds FTS entries from `chunks.content`.
    /// Safe to re-run (idempotent).
    pub fn populate_fts(&self) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM chunks_fts", [])?;
        tx.execute(
            "INSERT INTO chunks_fts(chunk_id, content) SELECT chunk_id, content FROM chunks",
            [],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Atomically clears and reloads the lexicon. Terms are lowercase
    /// -normalized on write.
    pub fn populate_high_risk_lexicon(&self, terms: &[HighRiskTermDef]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM high_risk_terms", [])?;
        for t in terms {
            tx.execute(
                "INSERT INTO high_risk_terms (term, category, severity) VALUES (?1, ?2, ?3)",
                params![t.term.to_lowercase(), t.category, t.severity.as_str()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn update_approval(&self, doc_id: &str, status: ApprovalStatus) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE documents SET approval_status = ?1 WHERE doc_id = ?2",
            params![status.as_str(), doc_id],
        )?;
        Ok(())
    }

    pub fn get_document(&self, doc_id: &str) -> Result<Option<Document>> {
        let conn = self.conn.lock();
        let doc = conn
            .query_row(
                "SELECT doc_id, filename, title, version, extraction_date,
                        approval_status, docling_json, page_count
                 FROM documents WHERE doc_id = ?1",
                params![doc_id],
                row_to_document,
            )
            .optional()?;
        Ok(doc)
    }

    pub fn list_documents(&self, status: Option<ApprovalStatus>) -> Result<Vec<Document>> {
        let conn = self.conn.lock();
        let mut out = Vec::new();
        if let Some(status) = status {
            let mut stmt = conn.prepare(
                "SELECT doc_id, filename, title, version, extraction_date,
                        approval_status, docling_json, page_count
                 FROM documents WHERE approval_status = ?1 ORDER BY extraction_date DESC",
            )?;
            let rows = stmt.query_map(params![status.as_str()], row_to_document)?;
            for r in rows {
                out.push(r?);
            }
        } else {
            let mut stmt = conn.prepare(
                "SELECT doc_id, filename, title, version, extraction_date,
                        approval_status, docling_json, page_count
                 FROM documents ORDER BY extraction_date DESC",
            )?;
            let rows = stmt.query_map([], row_to_document)?;
            for r in rows {
                out.push(r?);
            }
        }
        Ok(out)
    }

    pub fn get_chunks(
        &self,
        doc_id: &str,
        category: Option<ChunkCategory>,
    ) -> Result<Vec<ChunkRecord>> {
        let conn = self.conn.lock();
        let base = "SELECT c.chunk_id, c.doc_id, c.content, c.contextualized_text,
                           c.chunk_type, c.page_number, c.category,
                           m.headings_json, m.bbox_json, m.element_label
                    FROM chunks c
                    LEFT JOIN chunk_metadata m ON c.chunk_id = m.chunk_id
                    WHERE c.doc_id = ?1";
        let mut out = Vec::new();
        if let Some(category) = category {
            let sql = format!("{base} AND c.category = ?2 ORDER BY c.page_number, c.chunk_id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![doc_id, category.as_str()], row_to_chunk)?;
            for r in rows {
                out.push(r?);
            }
        } else {
            let sql = format!("{base} ORDER BY c.page_number, c.chunk_id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![doc_id], row_to_chunk)?;
            for r in rows {
                out.push(r?);
            }
        }
        Ok(out)
    }

    pub fn chunk_count(&self, doc_id: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE doc_id = ?1",
            params![doc_id],
            |r| r.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn lexicon(&self) -> Result<Vec<HighRiskTermDefOwned>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT term, category, severity FROM high_risk_terms")?;
        let rows = stmt.query_map([], |r| {
            Ok(HighRiskTermDefOwned {
                term: r.get(0)?,
                category: r.get(1)?,
                severity: Severity::parse(&r.get::<_, String>(2)?),
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Vector Index `knn`. No predicate support (the index's own
    /// contract): fetches the `k` nearest neighbors by cosine distance,
    /// ascending (smallest distance first), over every row in
    /// `embeddings`. Exact brute force — acceptable per spec for smaller
    /// corpora.
    pub fn vector_knn(&self, query_vec: &[f32], k: usize) -> Result<Vec<ChunkHit>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT e.chunk_id, e.embedding, c.content, c.page_number, c.category,
                    m.headings_json
             FROM embeddings e
             INNER JOIN chunks c ON c.chunk_id = e.chunk_id
             LEFT JOIN chunk_metadata m ON c.chunk_id = m.chunk_id",
        )?;
        let mut scored: Vec<ChunkHit> = stmt
            .query_map([], |r| {
                let chunk_id: String = r.get(0)?;
                let blob: Vec<u8> = r.get(1)?;
                let content: String = r.get(2)?;
                let page_number: Option<u32> = r.get(3)?;
                let category: String = r.get(4)?;
                let headings_json: Option<String> = r.get(5)?;
                Ok((chunk_id, blob, content, page_number, category, headings_json))
            })?
            .filter_map(|row| row.ok())
            .map(|(chunk_id, blob, content, page_number, category, headings_json)| {
                let vector = blob_to_vector(&blob);
                let distance = cosine_distance(query_vec, &vector);
                ChunkHit {
                    chunk_id,
                    content,
                    page_number,
                    category: ChunkCategory::parse(&category),
                    headings: headings_json
                        .and_then(|j| serde_json::from_str(&j).ok())
                        .unwrap_or_default(),
                    raw_score: distance,
                }
            })
            .collect();
        scored.sort_by(|a, b| a.raw_score.partial_cmp(&b.raw_score).unwrap());
        scored.truncate(k);
        Ok(scored)
    }

    /// Lexical Index `bm25`. Pushes `category = 'content'` into the query
    /// (lexical indices tolerate such joins, unlike the vector index).
    /// Caller is responsible for empty-query short-circuiting.
    pub fn bm25_search(&self, fts_query: &str, k: usize) -> Result<Vec<ChunkHit>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT c.chunk_id, c.content, c.page_number, c.category,
                    m.headings_json, bm25(chunks_fts) as bm25_score
             FROM chunks_fts fts
             JOIN chunks c ON fts.chunk_id = c.chunk_id
             LEFT JOIN chunk_metadata m ON c.chunk_id = m.chunk_id
             WHERE chunks_fts MATCH ?1 AND c.category = 'content'
             ORDER BY bm25(chunks_fts)
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![fts_query, k as i64], |r| {
            let headings_json: Option<String> = r.get(4)?;
            Ok(ChunkHit {
                chunk_id: r.get(0)?,
                content: r.get(1)?,
                page_number: r.get(2)?,
                category: ChunkCategory::parse(&r.get::<_, String>(3)?),
                headings: headings_json
                    .and_then(|j| serde_json::from_str(&j).ok())
                    .unwrap_or_default(),
                raw_score: r.get::<_, f64>(5)? as f32,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}

#[derive(Debug, Clone)]
pub struct HighRiskTermDefOwned {
    pub term: String,
    pub category: String,
    pub severity: Severity,
}

fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<Document> {
    let status: String = row.get(5)?;
    Ok(Document {
        doc_id: row.get(0)?,
        filename: row.get(1)?,
        title: row.get(2)?,
        version: row.get(3)?,
        extraction_date: row.get(4)?,
        approval_status: ApprovalStatus::parse(&status).unwrap_or(ApprovalStatus::Pending),
        raw_payload: row.get(6)?,
        page_count: row.get(7)?,
    })
}

fn row_to_chunk(row: &rusqlite::Row) -> rusqlite::Result<ChunkRecord> {
    let headings_json: Option<String> = row.get(7)?;
    let bbox_json: Option<String> = row.get(8)?;
    Ok(ChunkRecord {
        chunk_id: row.get(0)?,
        doc_id: row.get(1)?,
        content: row.get(2)?,
        contextualized_text: row.get(3)?,
        chunk_type: ChunkType::parse(&row.get::<_, String>(4)?),
        page_number: row.get(5)?,
        category: ChunkCategory::parse(&row.get::<_, String>(6)?),
        headings: headings_json
            .and_then(|j| serde_json::from_str(&j).ok())
            .unwrap_or_default(),
        bbox: bbox_json.and_then(|j| serde_json::from_str::<BBox>(&j).ok()),
        element_label: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkCategory, ChunkType};

    fn sample_chunk(id: &str, content: &str, category: ChunkCategory) -> ChunkRecord {
        ChunkRecord {
            chunk_id: id.to_string(),
            doc_id: "doc1".to_string(),
            content: content.to_string(),
            contextualized_text: format!("General\n{content}"),
            chunk_type: ChunkType::Text,
            page_number: Some(1),
            category,
            headings: vec!["General".to_string()],
            bbox: None,
            element_label: String::new(),
        }
    }

    #[test]
    fn insert_chunk_round_trips_content_and_headings() {
        let store = CorpusStore::in_memory().unwrap();
        let doc_id = store
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
            .unwrap();
        let chunk = sample_chunk("c1", "Malaria danger signs", ChunkCategory::Content);
        store.insert_chunk(&doc_id, &chunk).unwrap();

        let fetched = store.get_chunks(&doc_id, None).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].content, chunk.content);
        assert_eq!(fetched[0].contextualized_text, chunk.contextualized_text);
        assert_eq!(fetched[0].headings, chunk.headings);
    }

    #[test]
    fn insert_chunk_requires_existing_document() {
        let store = CorpusStore::in_memory().unwrap();
        let chunk = sample_chunk("c1", "orphan", ChunkCategory::Content);
        assert!(store.insert_chunk("missing-doc", &chunk).is_err());
    }

    #[test]
    fn populate_fts_is_idempotent() {
        let store = CorpusStore::in_memory().unwrap();
        let doc_id = store
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
            .unwrap();
        store
            .insert_chunk(&doc_id, &sample_chunk("c1", "malaria treatment", ChunkCategory::Content))
            .unwrap();
        store.populate_fts().unwrap();
        let first = store.bm25_search("\"malaria\"", 5).unwrap();
        store.populate_fts().unwrap();
        let second = store.bm25_search("\"malaria\"", 5).unwrap();
        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn embedding_dimension_mismatch_rejected() {
        let store = CorpusStore::in_memory().unwrap();
        let doc_id = store
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
            .unwrap();
        store
            .insert_chunk(&doc_id, &sample_chunk("c1", "x", ChunkCategory::Content))
            .unwrap();
        let bad = vec![0.0f32; 10];
        assert!(store.insert_embedding("c1", &bad).is_err());
    }
}
