//! The `Context` value: every shared handle the pipeline needs, bundled
//! once at startup and passed by reference or `Arc`. No process-wide
//! singletons (§9 design note).

use crate::config::CoreConfig;
use crate::embeddings::minilm::{MiniLmConfig, MiniLmEmbedder};
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::lexicon::HighRiskLexicon;
use crate::store::CorpusStore;
use crate::synthesis::GenerationBackend;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub struct Context {
    pub config: CoreConfig,
    pub store: CorpusStore,
    pub embedder: Arc<dyn Embedder>,
    pub backend: GenerationBackend,
    pub lexicon: HighRiskLexicon,
    /// Bounds in-flight generation requests against the backend.
    pub generation_permits: Arc<Semaphore>,
}

impl Context {
    pub fn new(config: CoreConfig) -> Result<Self> {
        let store = CorpusStore::open(&config.store.db_path)?;
        let embedder: Arc<dyn Embedder> = Arc::new(MiniLmEmbedder::new(MiniLmConfig::from_model_dir(
            &config.embedding.model_dir,
            &config.embedding.device,
        ))?);
        let backend = GenerationBackend::new(&config.backend)?;
        // The store's high_risk_terms table is populated from this same
        // curated list at ingestion time (see pipeline::run_pipeline), so
        // there is no divergent source to reconcile here.
        let lexicon = HighRiskLexicon::curated();
        let generation_permits = Arc::new(Semaphore::new(config.backend.max_in_flight));

        Ok(Self {
            config,
            store,
            embedder,
            backend,
            lexicon,
            generation_permits,
        })
    }

    /// Builds a [`Context`] over an existing store handle (used by tests
    /// and by `search`-only CLI invocations that don't need a generation
    /// backend reachable).
    pub fn with_store(config: CoreConfig, store: CorpusStore, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let backend = GenerationBackend::new(&config.backend)?;
        let lexicon = HighRiskLexicon::curated();
        let generation_permits = Arc::new(Semaphore::new(config.backend.max_in_flight));
        Ok(Self {
            config,
            store,
            embedder,
            backend,
            lexicon,
            generation_permits,
        })
    }
}
