//! Ollama generation backend (`/api/generate`, non-streaming).

use super::{GenerationOptions, ModelInfo, TextGenerator};
use crate::error::{EvalError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

/// Default local Ollama endpoint.
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Generates text through a running Ollama server.
pub struct OllamaGenerator {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    fn request_body(&self, prompt: &str, options: &GenerationOptions) -> Value {
        let mut model_options = serde_json::Map::new();
        if let Some(stop) = &options.stop_sequence {
            model_options.insert("stop".into(), json!([stop]));
        }
        if let Some(size) = options.generation_size {
            model_options.insert("num_predict".into(), json!(size));
        }
        if options.do_sample == Some(false) {
            model_options.insert("temperature".into(), json!(0.0));
        }

        let mut body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        if !model_options.is_empty() {
            body["options"] = Value::Object(model_options);
        }
        body
    }

    async fn post_generate(&self, body: &Value) -> Result<String> {
        let url = format!("{}/api/generate", self.endpoint);
        debug!(url = %url, model = %self.model, "Sending Ollama generate request");

        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(EvalError::generation(format!(
                "Ollama returned {status}: {}",
                text.trim()
            )));
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)
            .map_err(|e| EvalError::generation(format!("Invalid Ollama response: {e}")))?;
        Ok(parsed.response)
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    fn model_info(&self) -> ModelInfo {
        ModelInfo::named(&self.model)
    }

    /// An empty prompt makes Ollama load the model without generating.
    async fn load(&self) -> Result<()> {
        let body = json!({ "model": self.model, "prompt": "", "stream": false });
        self.post_generate(&body)
            .await
            .map(|_| ())
            .map_err(|e| EvalError::model_load(format!("{}: {e}", self.model)))
    }

    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let body = self.request_body(prompt, options);
        self.post_generate(&body).await
    }
}
