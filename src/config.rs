//! Process configuration. A single value, constructed once at startup and
//! carried explicitly through the call chain (see [`crate::context::Context`])
//! rather than read from globals.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    pub store: StoreConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub synthesis: SynthesisConfig,
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model_dir: PathBuf,
    pub model_id: String,
    pub dimension: usize,
    /// Execution-provider hint (`cpu`, `cuda`, `coreml`, ...). Accepted and
    /// threaded through to the embedder for logging; only `cpu` is actually
    /// wired as an `ort` execution provider (§6 [FULL] CLI wiring).
    pub device: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub candidate_k: usize,
    pub candidate_multiplier: usize,
    pub rrf_k: usize,
    pub min_content_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub repeat_penalty: f32,
    pub synth_context_chars: usize,
    pub guardrail_context_chars: usize,
    pub guardrail_max_tokens: u32,
    pub guardrail_temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_in_flight: usize,
}

impl CoreConfig {
    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> Result<(), String> {
        if self.embedding.dimension != crate::types::EMBEDDING_DIM {
            return Err(format!(
                "embedding.dimension must be {}, got {}",
                crate::types::EMBEDDING_DIM,
                self.embedding.dimension
            ));
        }
        if self.search.candidate_k == 0 {
            return Err("search.candidate_k must be > 0".into());
        }
        if self.search.candidate_multiplier == 0 {
            return Err("search.candidate_multiplier must be > 0".into());
        }
        if self.search.rrf_k == 0 {
            return Err("search.rrf_k must be > 0".into());
        }
        if !(0.0..=1.0).contains(&self.synthesis.top_p) {
            return Err("synthesis.top_p must be in [0.0, 1.0]".into());
        }
        if self.backend.max_in_flight == 0 {
            return Err("backend.max_in_flight must be > 0".into());
        }
        Ok(())
    }

    /// Load config from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config file: {e}"))?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| format!("failed to parse config: {e}"))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chw-clinical-core");

        Self {
            store: StoreConfig {
                db_path: PathBuf::from("data/databases/guidelines.db"),
            },
            embedding: EmbeddingConfig {
                model_dir: data_dir.join("models").join("all-MiniLM-L6-v2"),
                model_id: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
                dimension: crate::types::EMBEDDING_DIM,
                device: "cpu".to_string(),
            },
            search: SearchConfig {
                candidate_k: 15,
                candidate_multiplier: 3,
                rrf_k: 60,
                min_content_chars: 50,
            },
            synthesis: SynthesisConfig {
                max_tokens: 512,
                temperature: 0.3,
                top_p: 0.9,
                repeat_penalty: 1.1,
                synth_context_chars: 4000,
                guardrail_context_chars: 3000,
                guardrail_max_tokens: 300,
                guardrail_temperature: 0.1,
            },
            backend: BackendConfig {
                base_url: "http://localhost:11434".to_string(),
                model: "hf.co/unsloth/medgemma-1.5-4b-it-GGUF:Q4_K_M".to_string(),
                timeout_secs: 120,
                max_in_flight: 1,
            },
        }
    }
}
