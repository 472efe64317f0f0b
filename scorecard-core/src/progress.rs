//! Progress callbacks for evaluation runs.
//!
//! Every method has a no-op default, so a reporter only implements what it
//! displays.

use crate::metrics::EvaluationMetrics;
use serde::{Deserialize, Serialize};

/// Severity attached to a reporter log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Info,
    Error,
    Success,
}

/// Callback surface notified while a run progresses.
///
/// Call order for a successful run of `n` examples:
/// 1. `on_log("", Info, clear = true)`
/// 2. `on_log("Loading model...", Info)` if the model was not loaded yet
/// 3. `on_log("Starting evaluation on dataset: ...", Info)`
/// 4. per example: `on_progress`, then an `on_log` progress line
/// 5. `on_log("Evaluation complete!", Success)`, then `on_complete`
///
/// A failed run ends with exactly one `on_log(.., Error)`.
#[async_trait::async_trait]
pub trait ProgressReporter: Send + Sync {
    /// A display line. `clear` asks the display to drop earlier lines first.
    async fn on_log(&self, _message: &str, _severity: LogSeverity, _clear: bool) {}

    /// Called after every example with percent complete in `(0, 100]`.
    async fn on_progress(&self, _percent: f64, _metrics: &EvaluationMetrics) {}

    /// Called once with the final snapshot.
    async fn on_complete(&self, _metrics: &EvaluationMetrics) {}
}

/// Reporter that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

#[async_trait::async_trait]
impl ProgressReporter for NoopReporter {}

/// Forwards reporter callbacks to `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

#[async_trait::async_trait]
impl ProgressReporter for TracingReporter {
    async fn on_log(&self, message: &str, severity: LogSeverity, _clear: bool) {
        if message.is_empty() {
            return;
        }
        match severity {
            LogSeverity::Info => tracing::info!("{message}"),
            LogSeverity::Success => tracing::info!(success = true, "{message}"),
            LogSeverity::Error => tracing::error!("{message}"),
        }
    }

    async fn on_progress(&self, percent: f64, metrics: &EvaluationMetrics) {
        tracing::debug!(
            percent,
            accuracy = metrics.accuracy,
            tokens = metrics.tokens_processed,
            "Progress"
        );
    }

    async fn on_complete(&self, metrics: &EvaluationMetrics) {
        tracing::info!(
            accuracy = metrics.accuracy,
            eval_time_secs = metrics.eval_time,
            tokens = metrics.tokens_processed,
            "Evaluation finished"
        );
    }
}

/// One captured callback.
#[derive(Debug, Clone, PartialEq)]
pub enum ReporterEvent {
    Log {
        message: String,
        severity: LogSeverity,
        clear: bool,
    },
    Progress {
        percent: f64,
        metrics: EvaluationMetrics,
    },
    Complete(EvaluationMetrics),
}

/// Records every callback in order. Useful in tests and for replaying a run
/// into a display after the fact.
pub struct RecordingReporter {
    events: tokio::sync::Mutex<Vec<ReporterEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self {
            events: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    pub async fn events(&self) -> Vec<ReporterEvent> {
        self.events.lock().await.clone()
    }

    /// Log lines with the given severity, in order.
    pub async fn logs_with(&self, severity: LogSeverity) -> Vec<String> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|event| match event {
                ReporterEvent::Log {
                    message,
                    severity: s,
                    ..
                } if *s == severity => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn progress_percents(&self) -> Vec<f64> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|event| match event {
                ReporterEvent::Progress { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect()
    }

    pub async fn completed(&self) -> Option<EvaluationMetrics> {
        self.events.lock().await.iter().find_map(|event| match event {
            ReporterEvent::Complete(metrics) => Some(metrics.clone()),
            _ => None,
        })
    }
}

impl Default for RecordingReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ProgressReporter for RecordingReporter {
    async fn on_log(&self, message: &str, severity: LogSeverity, clear: bool) {
        self.events.lock().await.push(ReporterEvent::Log {
            message: message.to_string(),
            severity,
            clear,
        });
    }

    async fn on_progress(&self, percent: f64, metrics: &EvaluationMetrics) {
        self.events.lock().await.push(ReporterEvent::Progress {
            percent,
            metrics: metrics.clone(),
        });
    }

    async fn on_complete(&self, metrics: &EvaluationMetrics) {
        self.events
            .lock()
            .await
            .push(ReporterEvent::Complete(metrics.clone()));
    }
}
