//! Text generation backends.
//!
//! The harness treats generation as an opaque async call. Backends own model
//! resources; the session only tracks whether it has asked for a load.

pub mod mock;
pub mod ollama;

use crate::config::{BackendKind, GenerationConfig};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub use mock::MockGenerator;
pub use ollama::OllamaGenerator;

/// Per-call generation options. Unset fields use the backend's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(default)]
    pub stop_sequence: Option<String>,
    /// Maximum number of tokens to generate.
    #[serde(default)]
    pub generation_size: Option<usize>,
    #[serde(default)]
    pub do_sample: Option<bool>,
}

/// Descriptive metadata about the model behind a backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub model_sha: Option<String>,
    pub model_dtype: Option<String>,
    pub model_size: Option<String>,
}

impl ModelInfo {
    pub fn named(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Default::default()
        }
    }
}

/// A text-generation capability.
///
/// Callers issue at most one request at a time per evaluation run.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn model_info(&self) -> ModelInfo;

    /// Make the model ready. Called once per session before the first
    /// generation, and again only after the session is reset.
    async fn load(&self) -> Result<()>;

    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;
}

/// Build the backend selected in `config`.
pub fn build_generator(config: &GenerationConfig) -> Result<Arc<dyn TextGenerator>> {
    match config.backend {
        BackendKind::Ollama => Ok(Arc::new(OllamaGenerator::new(
            &config.endpoint,
            &config.model,
            Duration::from_secs(config.timeout_secs),
        )?)),
        // Dry runs: every prompt is answered with "A".
        BackendKind::Mock => Ok(Arc::new(MockGenerator::with_fallback("A"))),
    }
}
