//! Hybrid retrieval: dense vector search and lexical BM25 search fused by
//! Reciprocal Rank Fusion. Grounded in
//! `original_source/extraction/src/medgemma_synthesis.py::BrainOneSearch`
//! and the fusion shape of `search/hybrid.rs`.

use crate::config::SearchConfig;
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::store::{ChunkHit, CorpusStore};
use crate::types::{SearchResult, Source};
use std::collections::HashMap;

/// Escapes an FTS5 MATCH query by quoting each token, so punctuation in
/// free-text queries can't be read as FTS5 query syntax.
fn fts_query(text: &str) -> String {
    text.split_whitespace()
        .map(|tok| format!("\"{}\"", tok.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct Retriever<'a> {
    store: &'a CorpusStore,
    embedder: &'a dyn Embedder,
    config: &'a SearchConfig,
}

impl<'a> Retriever<'a> {
    pub fn new(store: &'a CorpusStore, embedder: &'a dyn Embedder, config: &'a SearchConfig) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Vector Index lookup. The index itself supports no predicate, so it
    /// is over-fetched by `candidate_multiplier` and filtered here:
    /// metadata chunks and chunks shorter than `min_content_chars` are
    /// dropped after retrieval, never pushed into the index query.
    pub fn search_vector(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let query_vec = self.embedder.embed(query)?;
        let fetch_k = top_k * self.config.candidate_multiplier;
        let hits = self.store.vector_knn(&query_vec, fetch_k)?;
        let filtered: Vec<SearchResult> = hits
            .into_iter()
            .filter(|h| {
                h.category == crate::types::ChunkCategory::Content
                    && h.content.trim().chars().count() >= self.config.min_content_chars
            })
            .take(top_k)
            .map(|h| hit_to_result(h, Source::Vector, |d| 1.0 - d))
            .collect();
        Ok(filtered)
    }

    /// Lexical Index lookup. `category = 'content'` is pushed into the
    /// SQL query itself — the lexical index tolerates predicates, unlike
    /// the vector index.
    pub fn search_keyword(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let hits = self.store.bm25_search(&fts_query(query), top_k)?;
        Ok(hits
            .into_iter()
            .map(|h| hit_to_result(h, Source::Keyword, |s| -s))
            .collect())
    }

    /// Hybrid search: fuses `search_vector` and `search_keyword` result
    /// lists with Reciprocal Rank Fusion, `RRF_K` from config (60 per
    /// spec). Both sub-searches run at the fixed `candidate_k` (15 by
    /// default), not scaled by this call's own `top_k` — the sub-lists
    /// that feed RRF are a fixed candidate pool, independent of how many
    /// fused results the caller ultimately wants. Ties in fused score are
    /// broken by first-observed order — the vector list is visited before
    /// the keyword list — which is why fusion tracks insertion order
    /// explicitly instead of going through a plain hash map (a
    /// `HashMap`-only fusion, as in the model this was adapted from,
    /// loses that order and can't honor the tie-break).
    pub fn search_hybrid(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let vector_results = self.search_vector(query, self.config.candidate_k)?;
        let keyword_results = self.search_keyword(query, self.config.candidate_k)?;

        let mut order: Vec<String> = Vec::new();
        let mut by_id: HashMap<String, (f32, SearchResult)> = HashMap::new();

        for (rank, r) in vector_results.into_iter().enumerate() {
            let rrf = 1.0 / (self.config.rrf_k as f32 + rank as f32 + 1.0);
            by_id
                .entry(r.chunk_id.clone())
                .and_modify(|(s, _)| *s += rrf)
                .or_insert_with(|| {
                    order.push(r.chunk_id.clone());
                    (rrf, r)
                });
        }
        for (rank, r) in keyword_results.into_iter().enumerate() {
            let rrf = 1.0 / (self.config.rrf_k as f32 + rank as f32 + 1.0);
            by_id
                .entry(r.chunk_id.clone())
                .and_modify(|(s, _)| *s += rrf)
                .or_insert_with(|| {
                    order.push(r.chunk_id.clone());
                    (rrf, r)
                });
        }

        let mut fused: Vec<SearchResult> = order
            .into_iter()
            .map(|id| {
                let (score, mut result) = by_id.remove(&id).expect("id pushed implies entry exists");
                result.score = score;
                result.source = Source::Hybrid;
                result
            })
            .collect();

        // Stable sort keeps first-observed order (vector before keyword)
        // for equal fused scores, since `order` was built in that sequence.
        fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        fused.truncate(top_k);
        Ok(fused)
    }
}

fn hit_to_result(hit: ChunkHit, source: Source, score_fn: impl Fn(f32) -> f32) -> SearchResult {
    SearchResult {
        chunk_id: hit.chunk_id,
        content: hit.content,
        headings: hit.headings,
        page_number: hit.page_number,
        score: score_fn(hit.raw_score),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkCategory, ChunkRecord, ChunkType, DocumentMetadata};

    struct StubEmbedder;
    impl Embedder for StubEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0f32; crate::types::EMBEDDING_DIM];
            for (i, b) in text.bytes().enumerate() {
                v[i % v.len()] += b as f32;
            }
            Ok(v)
        }
        fn dimension(&self) -> usize {
            crate::types::EMBEDDING_DIM
        }
    }

    fn setup() -> (CorpusStore, StubEmbedder, SearchConfig) {
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
        let chunks = [
            ("c1", "Malaria causes high fever and convulsions in children", ChunkCategory::Content),
            ("c2", "Severe dehydration requires oral rehydration salts", ChunkCategory::Content),
            ("c3", "Headache management for mild cases", ChunkCategory::Content),
            ("c4", "Table of contents\n1. Malaria\n2. Dehydration", ChunkCategory::Metadata),
        ];
        for (id, content, category) in chunks {
            store
                .insert_chunk(
                    &doc_id,
                    &ChunkRecord {
                        chunk_id: id.to_string(),
                        doc_id: doc_id.clone(),
                        content: content.to_string(),
                        contextualized_text: format!("General\n{content}"),
                        chunk_type: ChunkType::Text,
                        page_number: Some(1),
                        category,
                        headings: vec!["General".to_string()],
                        bbox: None,
                        element_label: String::new(),
                    },
                )
                .unwrap();
        }
        store.populate_fts().unwrap();
        let embedder = StubEmbedder;
        for id in ["c1", "c2", "c3", "c4"] {
            let content = chunks.iter().find(|c| c.0 == id).unwrap().1;
            let vec = embedder.embed(content).unwrap();
            store.insert_embedding(id, &vec).unwrap();
        }
        let config = SearchConfig {
            candidate_k: 5,
            candidate_multiplier: 3,
            rrf_k: 60,
            min_content_chars: 10,
        };
        (store, embedder, config)
    }

    #[test]
    fn keyword_search_excludes_metadata_chunks() {
        let (store, embedder, config) = setup();
        let retriever = Retriever::new(&store, &embedder, &config);
        let results = retriever.search_keyword("malaria", 5).unwrap();
        assert!(results.iter().all(|r| r.chunk_id != "c4"));
        assert!(results.iter().any(|r| r.chunk_id == "c1"));
    }

    #[test]
    fn empty_query_returns_no_results() {
        let (store, embedder, config) = setup();
        let retriever = Retriever::new(&store, &embedder, &config);
        assert!(retriever.search_hybrid("", 5).unwrap().is_empty());
        assert!(retriever.search_vector("   ", 5).unwrap().is_empty());
    }

    #[test]
    fn hybrid_search_dedupes_and_fuses() {
        let (store, embedder, config) = setup();
        let retriever = Retriever::new(&store, &embedder, &config);
        let results = retriever.search_hybrid("malaria fever", 5).unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.chunk_id.as_str()).collect();
        let unique: std::collections::HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(ids.len(), unique.len());
    }
}
