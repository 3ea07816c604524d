//! Orchestration: ingestion (PDF → chunks → embeddings → FTS) and query
//! (search → synthesize → guardrail). Grounded in
//! `original_source/extraction/src/pipeline.py::run_pipeline` and
//! `medgemma_synthesis.py::ClinicalRAGPipeline`.

use crate::chunker::GuidelineChunker;
use crate::context::Context;
use crate::convert::DocumentConverter;
use crate::error::Result;
use crate::retriever::Retriever;
use crate::synthesis::prompts;
use crate::types::{DocumentMetadata, SynthesisResult, Timings};
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct IngestStats {
    pub doc_id: String,
    pub pages: u32,
    pub chunks: usize,
    pub embeddings: usize,
}

/// INIT → convert → chunk → embed → index. Each step's failure surfaces
/// as the matching `CoreError` variant; nothing here swallows an error.
pub fn run_ingest_pipeline(ctx: &Context, pdf_path: &Path, max_chars: usize) -> Result<IngestStats> {
    tracing::info!(pdf = %pdf_path.display(), "starting ingestion");
    let converted = DocumentConverter::convert_pdf(pdf_path)?;

    let metadata = DocumentMetadata {
        filename: pdf_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.pdf")
            .to_string(),
        title: converted.title.clone(),
        version: None,
        extraction_date: chrono::Utc::now().to_rfc3339(),
        page_count: converted.page_count,
    };

    let doc_id = ctx.store.insert_document(&metadata, None)?;

    let chunker = GuidelineChunker::new(max_chars, true);
    let chunks = chunker.chunk(&doc_id, &converted);
    for chunk in &chunks {
        ctx.store.insert_chunk(&doc_id, chunk)?;
    }

    let texts: Vec<&str> = chunks.iter().map(|c| c.contextualized_text.as_str()).collect();
    let vectors = ctx.embedder.embed_batch(&texts)?;
    let embeddings: Vec<(String, Vec<f32>)> = chunks
        .iter()
        .zip(vectors.into_iter())
        .map(|(c, v)| (c.chunk_id.clone(), v))
        .collect();
    ctx.store.insert_embeddings_batch(&embeddings)?;

    ctx.store.populate_fts()?;
    ctx.store
        .populate_high_risk_lexicon(crate::lexicon::HIGH_RISK_TERMS)?;

    tracing::info!(doc_id = %doc_id, chunks = chunks.len(), "ingestion complete");
    Ok(IngestStats {
        doc_id,
        pages: converted.page_count,
        chunks: chunks.len(),
        embeddings: embeddings.len(),
    })
}

/// SEARCHING → SYNTHESIZING → VALIDATING, the full query pipeline.
pub async fn query(ctx: &Context, question: &str, top_k: usize, run_guardrail: bool) -> Result<SynthesisResult> {
    let total_start = Instant::now();

    let search_start = Instant::now();
    // Vector KNN and BM25 are synchronous rusqlite calls; run them via
    // `block_in_place` so they don't stall other queries' async progress
    // on this worker thread (§5 scheduling model).
    let (chunks, alerts) = tokio::task::block_in_place(|| search(ctx, question, top_k))?;
    let search_ms = search_start.elapsed().as_secs_f64() * 1000.0;

    // SEARCH_EMPTY: nothing retrieved, skip synthesis rather than asking
    // the backend to ground a summary in zero evidence.
    if chunks.is_empty() {
        tracing::warn!(query = %question, "search returned no results, skipping synthesis");
        return Ok(SynthesisResult {
            query: question.to_string(),
            summary: "[no relevant guideline content found for this question]".to_string(),
            chunks_used: chunks,
            alerts,
            guardrail_passed: None,
            guardrail_text: None,
            timings: Timings {
                search_ms,
                synth_ms: 0.0,
                total_ms: total_start.elapsed().as_secs_f64() * 1000.0,
            },
        });
    }

    let synth_start = Instant::now();
    let prompt = prompts::synthesis_prompt(
        question,
        &chunks,
        &alerts,
        ctx.config.synthesis.synth_context_chars,
    );
    let summary = {
        let _permit = ctx.generation_permits.acquire().await.expect("semaphore not closed");
        ctx.backend.synthesize(&prompt, &ctx.config.synthesis).await?
    };
    let synth_ms = synth_start.elapsed().as_secs_f64() * 1000.0;

    let (guardrail_passed, guardrail_text) = if run_guardrail {
        let guardrail_prompt = prompts::guardrail_prompt(
            question,
            &summary,
            &chunks,
            ctx.config.synthesis.guardrail_context_chars,
        );
        let _permit = ctx.generation_permits.acquire().await.expect("semaphore not closed");
        let validation = ctx
            .backend
            .validate_guardrail(&guardrail_prompt, &ctx.config.synthesis)
            .await?;
        let passed = prompts::parse_guardrail_verdict(&validation);
        if !passed {
            tracing::warn!(query = %question, "guardrail rejected synthesized summary");
        }
        (Some(passed), Some(validation))
    } else {
        (None, None)
    };

    let total_ms = total_start.elapsed().as_secs_f64() * 1000.0;

    Ok(SynthesisResult {
        query: question.to_string(),
        summary,
        chunks_used: chunks,
        alerts,
        guardrail_passed,
        guardrail_text,
        timings: Timings {
            search_ms,
            synth_ms,
            total_ms,
        },
    })
}

/// Search-only mode: runs Hybrid search and alerting without a generation
/// backend call. Useful when the backend is unreachable or for evaluating
/// retrieval quality in isolation.
pub fn query_search_only(ctx: &Context, question: &str, top_k: usize) -> Result<SynthesisResult> {
    let search_start = Instant::now();
    let (chunks, alerts) = search(ctx, question, top_k)?;
    let search_ms = search_start.elapsed().as_secs_f64() * 1000.0;

    Ok(SynthesisResult {
        query: question.to_string(),
        summary: "[synthesis not run - search-only mode]".to_string(),
        chunks_used: chunks,
        alerts,
        guardrail_passed: None,
        guardrail_text: None,
        timings: Timings {
            search_ms,
            synth_ms: 0.0,
            total_ms: search_ms,
        },
    })
}

fn search(
    ctx: &Context,
    question: &str,
    top_k: usize,
) -> Result<(Vec<crate::types::SearchResult>, Vec<crate::types::HighRiskAlert>)> {
    let retriever = Retriever::new(&ctx.store, ctx.embedder.as_ref(), &ctx.config.search);
    let chunks = retriever.search_hybrid(question, top_k)?;
    let alerts = ctx.lexicon.detect(&chunks);
    Ok((chunks, alerts))
}
