//! Final run report, printed as a table or JSON.

use chrono::{DateTime, Utc};
use scorecard_core::{EvaluationMetrics, ModelInfo};
use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub dataset: String,
    pub model: ModelInfo,
    pub generated_at: DateTime<Utc>,
    pub metrics: EvaluationMetrics,
}

impl Report {
    pub fn new(dataset: &str, model: ModelInfo, metrics: EvaluationMetrics) -> Self {
        Self {
            dataset: dataset.to_string(),
            model,
            generated_at: Utc::now(),
            metrics,
        }
    }

    pub fn render_table(&self) -> String {
        let m = &self.metrics;
        let mut out = String::new();
        let _ = writeln!(out, "Scorecard: {}", self.dataset);
        let _ = writeln!(out, "Model:            {}", self.model.model_name);
        let _ = writeln!(
            out,
            "Generated:        {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let _ = writeln!(out, "Accuracy:         {:.2}%", m.accuracy * 100.0);
        let _ = writeln!(out, "Tokens processed: {}", m.tokens_processed);
        let _ = writeln!(out, "Latency:          {:.2}", m.latency);
        let _ = writeln!(
            out,
            "Memory usage:     {:.1} MiB",
            m.memory_usage as f64 / (1024.0 * 1024.0)
        );
        let _ = writeln!(out, "Eval time:        {:.2}s", m.eval_time);

        if m.logs.is_empty() {
            return out;
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Recent examples:");
        let _ = writeln!(
            out,
            "  {:<16} {:<10} {:<10} {}",
            "Format", "Expected", "Predicted", "Result"
        );
        for entry in m.logs.iter() {
            let format = entry
                .format
                .map(|f| format!("{f:?}"))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "  {:<16} {:<10} {:<10} {}",
                format,
                truncate(&entry.expected_answer, 10),
                truncate(&entry.predicted_answer, 10),
                if entry.is_correct { "correct" } else { "wrong" }
            );
        }
        out
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scorecard_core::MetricsAggregator;
    use scorecard_core::format::FormatResolver;
    use scorecard_core::scoring::score_response;

    fn sample_report() -> Report {
        let raw = serde_json::json!({
            "question": "2 + 2?",
            "choices": ["4", "5"],
            "answer": 0
        });
        let example = FormatResolver::new("local:sample.jsonl")
            .resolve(&raw)
            .into_example()
            .unwrap();
        let mut aggregator = MetricsAggregator::new();
        let score = score_response(&example, "B");
        let metrics = aggregator.record(&example, "B", &score);
        Report::new("local:sample.jsonl", ModelInfo::named("tiny"), metrics)
    }

    #[test]
    fn test_table_lists_recent_examples() {
        let table = sample_report().render_table();
        assert!(table.starts_with("Scorecard: local:sample.jsonl\n"));
        assert!(table.contains("Accuracy:         0.00%"));
        assert!(table.contains("StandardChoice"));
        assert!(table.contains("wrong"));
    }

    #[test]
    fn test_json_shape() {
        let value = serde_json::to_value(sample_report()).unwrap();
        assert_eq!(value["model"]["model_name"], "tiny");
        assert_eq!(value["metrics"]["accuracy"], 0.0);
        assert!(value["generated_at"].is_string());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer answer", 6), "a muc…");
    }
}
