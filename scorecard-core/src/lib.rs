//! # Scorecard Core
//!
//! Benchmark evaluation harness for text-generation models.
//! Classifies dataset records across common benchmark formats, renders
//! prompts, extracts and scores answers, and aggregates running metrics
//! while reporting progress to a pluggable reporter.

pub mod config;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod format;
pub mod generation;
pub mod metrics;
pub mod progress;
pub mod prompt;
pub mod scoring;
pub mod session;

// Re-export commonly used types at the crate root.
pub use config::{BackendKind, ConfigOverrides, ScorecardConfig, UnrecognizedPolicy, load_config};
pub use dataset::{DatasetId, DatasetSource, HttpDatasetSource, LocalDatasetSource, parse_jsonl};
pub use error::{EvalError, Result};
pub use extract::{ChoiceExtractor, extract_choice, extract_number};
pub use format::{
    ExampleKind, FormatResolver, ParsedExample, RawExample, Resolution, SourceFormat,
};
pub use generation::{
    GenerationOptions, MockGenerator, ModelInfo, OllamaGenerator, TextGenerator,
};
pub use metrics::{EvaluationLogEntry, EvaluationMetrics, MetricsAggregator, RecentLog};
pub use progress::{
    LogSeverity, NoopReporter, ProgressReporter, RecordingReporter, ReporterEvent,
    TracingReporter,
};
pub use prompt::{NumericStyle, PromptTemplate, build_prompt};
pub use scoring::{Score, score_response};
pub use session::EvalSession;
