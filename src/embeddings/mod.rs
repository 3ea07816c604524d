//! Embedding adapter boundary. A single `embed`/`embed_batch` contract —
//! unlike the teacher's E5 adapter there is no query/passage prefix
//! distinction; `all-MiniLM-L6-v2` was trained symmetrically.

pub mod minilm;

use crate::error::Result;

pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize;
}
