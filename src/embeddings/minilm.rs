//! `sentence-transformers/all-MiniLM-L6-v2` via ONNX Runtime. Mean-pools
//! the last hidden state over the attention mask and L2-normalizes, the
//! standard sentence-transformers pooling recipe. Grounded in the
//! inference shape of `embeddings/e5.rs`, adapted to a HF `tokenizers`
//! pipeline instead of a hand-rolled SentencePiece one (MiniLM ships a
//! plain WordPiece `tokenizer.json`).

use super::Embedder;
use crate::error::{CoreError, Result};
use crate::types::EMBEDDING_DIM;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

const MAX_SEQ_LEN: usize = 256;

pub struct MiniLmConfig {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    /// Execution-provider hint, pass-through only: CPU is the only provider
    /// actually registered with the session builder.
    pub device: String,
}

impl MiniLmConfig {
    pub fn from_model_dir(model_dir: &Path, device: &str) -> Self {
        Self {
            model_path: model_dir.join("model.onnx"),
            tokenizer_path: model_dir.join("tokenizer.json"),
            device: device.to_string(),
        }
    }
}

pub struct MiniLmEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

impl MiniLmEmbedder {
    pub fn new(config: MiniLmConfig) -> Result<Self> {
        if !config.model_path.exists() {
            return Err(CoreError::Configuration(format!(
                "embedding model not found at {}",
                config.model_path.display()
            )));
        }

        if config.device != "cpu" {
            tracing::warn!(
                device = %config.device,
                "only the cpu execution provider is wired; ignoring requested device"
            );
        }

        let num_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);

        let session = Session::builder()
            .map_err(|e| CoreError::Configuration(format!("session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| CoreError::Configuration(format!("optimization level: {e}")))?
            .with_intra_threads(num_threads)
            .map_err(|e| CoreError::Configuration(format!("intra threads: {e}")))?
            .with_inter_threads(1)
            .map_err(|e| CoreError::Configuration(format!("inter threads: {e}")))?
            .commit_from_file(&config.model_path)
            .map_err(|e| CoreError::Configuration(format!("failed to load model: {e}")))?;

        let tokenizer = Tokenizer::from_file(&config.tokenizer_path)
            .map_err(|e| CoreError::Configuration(format!("failed to load tokenizer: {e}")))?;

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }

    fn run(&self, ids: Vec<i64>, mask: Vec<i64>, seq_len: usize) -> Result<Vec<f32>> {
        let shape = vec![1, seq_len];
        let input_ids = Value::from_array((shape.clone(), ids))
            .map_err(|e| CoreError::Generation(format!("input_ids tensor: {e}")))?;
        let attention_mask = Value::from_array((shape, mask.clone()))
            .map_err(|e| CoreError::Generation(format!("attention_mask tensor: {e}")))?;

        let inputs = ort::inputs![
            "input_ids" => input_ids,
            "attention_mask" => attention_mask,
        ];

        let mut session = self.session.lock();
        let outputs = session
            .run(inputs)
            .map_err(|e| CoreError::Generation(format!("inference failed: {e}")))?;

        let output_name = outputs
            .iter()
            .find(|(name, _)| *name == "last_hidden_state" || *name == "token_embeddings")
            .map(|(name, _)| name.to_string())
            .ok_or_else(|| CoreError::Generation("no usable embedding output".to_string()))?;

        let (out_shape, data) = outputs[output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| CoreError::Generation(format!("extract output: {e}")))?;

        let hidden_dim = out_shape[2] as usize;
        let mut pooled = vec![0.0f32; hidden_dim];
        let mut mask_sum = 0.0f32;
        for pos in 0..seq_len {
            let m = mask[pos] as f32;
            if m > 0.0 {
                mask_sum += m;
                let offset = pos * hidden_dim;
                for dim in 0..hidden_dim {
                    pooled[dim] += data[offset + dim] * m;
                }
            }
        }
        if mask_sum > 0.0 {
            for v in &mut pooled {
                *v /= mask_sum;
            }
        }

        let norm: f32 = pooled.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 1e-12 {
            for v in &mut pooled {
                *v /= norm;
            }
        }
        Ok(pooled)
    }
}

impl Embedder for MiniLmEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| CoreError::Generation(format!("tokenize failed: {e}")))?;
        let mut ids: Vec<i64> = encoding.get_ids().iter().map(|&x| x as i64).collect();
        let mut mask: Vec<i64> = encoding.get_attention_mask().iter().map(|&x| x as i64).collect();
        ids.truncate(MAX_SEQ_LEN);
        mask.truncate(MAX_SEQ_LEN);
        let seq_len = ids.len();
        self.run(ids, mask, seq_len)
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_file_is_a_configuration_error() {
        let err = MiniLmEmbedder::new(MiniLmConfig {
            model_path: PathBuf::from("/nonexistent/model.onnx"),
            tokenizer_path: PathBuf::from("/nonexistent/tokenizer.json"),
            device: "cpu".to_string(),
        });
        assert!(matches!(err, Err(CoreError::Configuration(_))));
    }
}
