//! Evaluation session: lazy model loading, the per-example run loop and
//! reporter sequencing.

use crate::config::{ScorecardConfig, UnrecognizedPolicy};
use crate::dataset::{DatasetId, DatasetSource, build_source, parse_jsonl};
use crate::error::{EvalError, Result};
use crate::format::{FormatResolver, ParsedExample, Resolution};
use crate::generation::{GenerationOptions, ModelInfo, TextGenerator, build_generator};
use crate::metrics::{EvaluationMetrics, MetricsAggregator, ProcessMemory, RECENT_LOG_CAPACITY};
use crate::progress::{LogSeverity, NoopReporter, ProgressReporter};
use crate::scoring::score_response;
use std::sync::Arc;
use tracing::{Instrument, debug, info, warn};
use uuid::Uuid;

/// One model bound to one dataset source.
///
/// The loaded flag is set on first use and cleared only by [`cleanup`].
/// Runs take `&mut self`, so a session never has two runs in flight.
///
/// [`cleanup`]: EvalSession::cleanup
pub struct EvalSession {
    generator: Arc<dyn TextGenerator>,
    source: Arc<dyn DatasetSource>,
    reporter: Arc<dyn ProgressReporter>,
    options: GenerationOptions,
    policy: UnrecognizedPolicy,
    log_capacity: usize,
    model_loaded: bool,
}

impl EvalSession {
    pub fn new(generator: Arc<dyn TextGenerator>, source: Arc<dyn DatasetSource>) -> Self {
        Self {
            generator,
            source,
            reporter: Arc::new(NoopReporter),
            options: GenerationOptions::default(),
            policy: UnrecognizedPolicy::default(),
            log_capacity: RECENT_LOG_CAPACITY,
            model_loaded: false,
        }
    }

    /// Build the backend and dataset source named in `config`.
    pub fn from_config(config: &ScorecardConfig) -> Result<Self> {
        let generator = build_generator(&config.generation)?;
        let source = build_source(&config.dataset);
        Ok(Self::new(generator, source)
            .with_generation_options(config.generation.options.clone())
            .with_unrecognized_policy(config.evaluation.on_unrecognized)
            .with_log_capacity(config.evaluation.recent_log_capacity))
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_generation_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_unrecognized_policy(mut self, policy: UnrecognizedPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    pub fn is_model_loaded(&self) -> bool {
        self.model_loaded
    }

    pub fn model_info(&self) -> ModelInfo {
        self.generator.model_info()
    }

    /// Load the model unless a previous call already did.
    pub async fn ensure_loaded(&mut self) -> Result<()> {
        if !self.model_loaded {
            let info = self.generator.model_info();
            info!(model = %info.model_name, "Loading model");
            self.generator.load().await?;
            self.model_loaded = true;
        }
        Ok(())
    }

    /// Generate a completion with the session's options, loading first if needed.
    pub async fn generate(&mut self, prompt: &str) -> Result<String> {
        self.ensure_loaded().await?;
        self.generator.generate(prompt, &self.options).await
    }

    /// Forget that the model is loaded. Backend resources are untouched.
    pub fn cleanup(&mut self) {
        if self.model_loaded {
            debug!("Session reset; model will be reloaded on next use");
        }
        self.model_loaded = false;
    }

    /// Run every example in `dataset` (a `provider:filename` identifier)
    /// through the model and return the final metrics.
    ///
    /// Any failure is reported once through `on_log` with
    /// [`LogSeverity::Error`] and then returned.
    pub async fn evaluate(&mut self, dataset: &str) -> Result<EvaluationMetrics> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("evaluation", run_id = %run_id, dataset = %dataset);
        let reporter = Arc::clone(&self.reporter);

        reporter.on_log("", LogSeverity::Info, true).await;
        match self.run(dataset).instrument(span).await {
            Ok(metrics) => Ok(metrics),
            Err(e) => {
                warn!(run_id = %run_id, dataset = %dataset, error = %e, "Evaluation failed");
                reporter
                    .on_log(&format!("Evaluation error: {e}"), LogSeverity::Error, false)
                    .await;
                Err(e)
            }
        }
    }

    async fn run(&mut self, dataset: &str) -> Result<EvaluationMetrics> {
        let reporter = Arc::clone(&self.reporter);

        if !self.model_loaded {
            reporter
                .on_log("Loading model...", LogSeverity::Info, false)
                .await;
            self.ensure_loaded().await?;
        }

        reporter
            .on_log(
                &format!("Starting evaluation on dataset: {dataset}"),
                LogSeverity::Info,
                false,
            )
            .await;

        let id = DatasetId::parse(dataset)?;
        let text = self.source.fetch(&id).await?;
        let records = parse_jsonl(&text)?;
        if records.is_empty() {
            return Err(EvalError::EmptyDataset);
        }
        let total = records.len();
        info!(examples = total, policy = %self.policy, "Dataset loaded");

        let resolver = FormatResolver::new(id.as_str());
        let mut aggregator =
            MetricsAggregator::with_options(self.log_capacity, Box::new(ProcessMemory));
        let mut metrics = aggregator.snapshot();

        for (index, raw) in records.iter().enumerate() {
            if let Some(example) = self.example_for(&resolver, raw, index)? {
                let response = self.generate(&example.prompt).await?;
                let score = score_response(&example, &response);
                debug!(
                    index,
                    correct = score.is_correct,
                    predicted = %score.predicted_answer,
                    expected = %example.expected_answer,
                    "Scored example"
                );
                metrics = aggregator.record(&example, &response, &score);
            } else {
                metrics = aggregator.snapshot();
            }

            let percent = (index + 1) as f64 / total as f64 * 100.0;
            reporter.on_progress(percent, &metrics).await;
            reporter
                .on_log(
                    &format!("Processed {}/{} examples", index + 1, total),
                    LogSeverity::Info,
                    false,
                )
                .await;
        }

        info!(
            correct = aggregator.correct(),
            scored = aggregator.scored(),
            accuracy = metrics.accuracy,
            "Evaluation complete"
        );
        reporter
            .on_log("Evaluation complete!", LogSeverity::Success, false)
            .await;
        reporter.on_complete(&metrics).await;
        Ok(metrics)
    }

    /// Classify one record and apply the unrecognized-record policy.
    /// `None` means the record is skipped.
    fn example_for(
        &self,
        resolver: &FormatResolver,
        raw: &serde_json::Value,
        index: usize,
    ) -> Result<Option<ParsedExample>> {
        match resolver.resolve(raw) {
            Resolution::Resolved(example) => Ok(Some(example)),
            Resolution::Unrecognized => match self.policy {
                UnrecognizedPolicy::Skip => {
                    warn!(index, "Skipping record in unrecognized format");
                    Ok(None)
                }
                UnrecognizedPolicy::Score => {
                    warn!(index, "Scoring record in unrecognized format as empty example");
                    Ok(Some(ParsedExample::degenerate(raw)))
                }
                UnrecognizedPolicy::Fail => Err(EvalError::UnrecognizedFormat { index }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::MockGenerator;
    use async_trait::async_trait;

    struct InlineSource(&'static str);

    #[async_trait]
    impl DatasetSource for InlineSource {
        async fn fetch(&self, _id: &DatasetId) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_generate_loads_lazily_once() {
        let generator = Arc::new(MockGenerator::with_fallback("A"));
        let mut session = EvalSession::new(generator.clone(), Arc::new(InlineSource("")));
        assert!(!session.is_model_loaded());

        session.generate("first").await.unwrap();
        session.generate("second").await.unwrap();
        assert!(session.is_model_loaded());
        assert_eq!(generator.load_count(), 1);

        session.cleanup();
        assert!(!session.is_model_loaded());
        session.generate("third").await.unwrap();
        assert_eq!(generator.load_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_load_leaves_flag_unset() {
        let mut session = EvalSession::new(
            Arc::new(MockGenerator::failing_load()),
            Arc::new(InlineSource("")),
        );
        assert!(matches!(
            session.ensure_loaded().await,
            Err(EvalError::ModelLoad(_))
        ));
        assert!(!session.is_model_loaded());
    }

    #[tokio::test]
    async fn test_empty_dataset_is_an_error() {
        let mut session = EvalSession::new(
            Arc::new(MockGenerator::new()),
            Arc::new(InlineSource("\n\n")),
        );
        let err = session.evaluate("local:empty.jsonl").await.unwrap_err();
        assert!(matches!(err, EvalError::EmptyDataset));
    }

    #[test]
    fn test_model_info_passthrough() {
        let session = EvalSession::new(Arc::new(MockGenerator::new()), Arc::new(InlineSource("")));
        assert_eq!(session.model_info().model_name, "mock-model");
    }
}
