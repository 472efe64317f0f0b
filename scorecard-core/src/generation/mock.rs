//! Scripted generator for tests and dry runs.

use super::{GenerationOptions, ModelInfo, TextGenerator};
use crate::error::{EvalError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Returns queued responses in order, then a fixed fallback.
pub struct MockGenerator {
    model: String,
    responses: Mutex<VecDeque<Result<String>>>,
    fallback: String,
    fail_load: bool,
    loads: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            responses: Mutex::new(VecDeque::new()),
            fallback: String::new(),
            fail_load: false,
            loads: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A generator that answers every prompt with `text`.
    pub fn with_fallback(text: &str) -> Self {
        Self {
            fallback: text.to_string(),
            ..Self::new()
        }
    }

    /// A generator whose `load` always fails.
    pub fn failing_load() -> Self {
        Self {
            fail_load: true,
            ..Self::new()
        }
    }

    /// Queue the response for the next unanswered `generate` call.
    pub fn queue_response(&self, text: &str) {
        self.lock_responses().push_back(Ok(text.to_string()));
    }

    /// Queue a backend failure for the next unanswered `generate` call.
    pub fn queue_error(&self, message: &str) {
        self.lock_responses()
            .push_back(Err(EvalError::generation(message)));
    }

    /// How many times `load` has been called.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Every prompt received, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String>>> {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn model_info(&self) -> ModelInfo {
        ModelInfo::named(&self.model)
    }

    async fn load(&self) -> Result<()> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_load {
            return Err(EvalError::model_load(format!(
                "{} is not available",
                self.model
            )));
        }
        Ok(())
    }

    async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(prompt.to_string());
        self.lock_responses()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}
