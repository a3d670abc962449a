// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Vision inference client for local AI models

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::{EcosortError, Result};

/// Raw verdict from the vision model: an item label, a confidence score and
/// the model's free-text reasoning.
#[derive(Debug, Clone, Deserialize)]
pub struct Inference {
    pub label: String,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

/// Boundary trait for the external classifier. The rest of the system treats
/// the model as opaque: one image in, one [`Inference`] out.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Submit one base64-encoded image for classification. Issues exactly one
    /// external request; retry policy, if any, belongs to the caller.
    async fn infer(&self, image_base64: &str) -> Result<Inference>;

    /// Check that the engine is reachable
    async fn health_check(&self) -> Result<()>;

    /// Check that the configured model is available
    async fn model_available(&self) -> Result<bool>;
}

/// Ollama-backed inference engine
pub struct OllamaEngine {
    client: Client,
    base_url: String,
    model: String,
    prompt: String,
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    images: Vec<String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ModelInfo {
    name: String,
}

impl OllamaEngine {
    /// Create a new engine client
    pub fn new(base_url: &str, model: &str, prompt: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        // Normalize URL
        let base_url = base_url
            .trim_end_matches('/')
            .replace("/api/generate", "")
            .replace("/api/chat", "");

        Self {
            client,
            base_url,
            model: model.to_string(),
            prompt: prompt.to_string(),
        }
    }

    /// List available models
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            EcosortError::InferenceUnavailable(format!("Cannot list models: {}", e))
        })?;

        let tags: TagsResponse = response.json().await.map_err(|e| {
            EcosortError::InferenceUnavailable(format!("Malformed model list: {}", e))
        })?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl InferenceEngine for OllamaEngine {
    async fn infer(&self, image_base64: &str) -> Result<Inference> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: self.prompt.clone(),
            stream: false,
            images: vec![image_base64.to_string()],
        };

        debug!("Sending vision request: model={}", self.model);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                EcosortError::InferenceUnavailable(format!(
                    "Cannot reach inference engine at {}: {}",
                    self.base_url, e
                ))
            })?;

        if !response.status().is_success() {
            return Err(EcosortError::InferenceUnavailable(format!(
                "Engine returned status {}",
                response.status()
            )));
        }

        let result: GenerateResponse = response.json().await.map_err(|e| {
            EcosortError::InferenceUnavailable(format!("Malformed engine response: {}", e))
        })?;

        parse_verdict(&result.response)
    }

    async fn health_check(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.base_url);

        self.client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                EcosortError::InferenceUnavailable(format!(
                    "Cannot connect to inference engine at {}: {}",
                    self.base_url, e
                ))
            })?;

        Ok(())
    }

    async fn model_available(&self) -> Result<bool> {
        let models = self.list_models().await?;
        Ok(models
            .iter()
            .any(|m| m.starts_with(&self.model) || m == &format!("{}:latest", self.model)))
    }
}

/// Extract the JSON verdict from the model's text output. Vision models wrap
/// JSON in prose or code fences often enough that we scan for the outermost
/// object instead of parsing the whole response.
pub fn parse_verdict(text: &str) -> Result<Inference> {
    let start = text.find('{');
    let end = text.rfind('}');

    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &text[s..=e],
        _ => {
            return Err(EcosortError::InferenceUnavailable(format!(
                "No JSON verdict in model output: {:?}",
                text
            )))
        }
    };

    let mut verdict: Inference = serde_json::from_str(json).map_err(|e| {
        EcosortError::InferenceUnavailable(format!("Unparseable verdict: {}", e))
    })?;

    verdict.confidence = verdict.confidence.clamp(0.0, 1.0);
    Ok(verdict)
}

/// Default prompt instructing the vision model to emit a JSON verdict
pub const DEFAULT_PROMPT: &str =
    "Identify the main waste item in this image. Respond with ONLY a JSON object: \
     {\"label\": \"<short item name>\", \"confidence\": <0.0-1.0>, \
     \"reasoning\": \"<one sentence>\"}";
