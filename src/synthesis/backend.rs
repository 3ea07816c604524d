//! Ollama-shaped generation backend client. Grounded in
//! `original_source/extraction/src/medgemma_synthesis.py::BrainTwoSynthesis`
//! and the HTTP-client shape of `llm/external.rs`.

use crate::config::{BackendConfig, SynthesisConfig};
use crate::error::{CoreError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[allow(dead_code)]
    models: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f32,
    top_p: f32,
    repeat_penalty: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct GenerationBackend {
    client: Client,
    base_url: String,
    model: String,
}

impl GenerationBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CoreError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
        })
    }

    /// `GET /api/tags` — whether the backend is reachable at all.
    pub async fn is_available(&self) -> bool {
        let endpoint = format!("{}/api/tags", self.base_url);
        match self.client.get(&endpoint).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// `POST /api/generate`, non-streaming.
    pub async fn generate(&self, prompt: &str, synth: &SynthesisConfig) -> Result<String> {
        self.generate_with_options(
            prompt,
            synth.max_tokens,
            synth.temperature,
            synth.top_p,
            synth.repeat_penalty,
        )
        .await
    }

    async fn generate_with_options(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
        top_p: f32,
        repeat_penalty: f32,
    ) -> Result<String> {
        let endpoint = format!("{}/api/generate", self.base_url);
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": GenerateOptions {
                num_predict: max_tokens,
                temperature,
                top_p,
                repeat_penalty,
            },
        });

        let response = self
            .client
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::Generation(format!("request to {endpoint} timed out"))
                } else if e.is_connect() {
                    CoreError::Generation(format!("failed to connect to {endpoint}: {e}"))
                } else {
                    CoreError::Generation(format!("request to {endpoint} failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CoreError::Generation(format!(
                "generation backend error ({status}): {text}"
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| CoreError::Generation(format!("failed to parse backend response: {e}")))?;
        Ok(parsed.response)
    }

    /// Synthesizer pass: produce a grounded clinical summary.
    pub async fn synthesize(&self, prompt: &str, synth: &SynthesisConfig) -> Result<String> {
        self.generate(prompt, synth).await
    }

    /// Guardrail pass: independent validation of a synthesized summary.
    /// Returns the raw validation text; callers use
    /// [`super::prompts::parse_guardrail_verdict`] to get the verdict.
    pub async fn validate_guardrail(&self, prompt: &str, synth: &SynthesisConfig) -> Result<String> {
        self.generate_with_options(
            prompt,
            synth.guardrail_max_tokens,
            synth.guardrail_temperature,
            synth.top_p,
            synth.repeat_penalty,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_backend_reports_unavailable() {
        let backend = GenerationBackend::new(&BackendConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            model: "test-model".to_string(),
            timeout_secs: 1,
            max_in_flight: 1,
        })
        .unwrap();
        assert!(!backend.is_available().await);
    }
}
