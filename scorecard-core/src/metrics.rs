//! Running evaluation metrics.
//!
//! The aggregator owns every counter for a run and produces a full
//! [`EvaluationMetrics`] snapshot after each example. Snapshots are values,
//! not diffs; the last one is the run's result.

use crate::format::{ExampleKind, ParsedExample, SourceFormat};
use crate::scoring::Score;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Instant;

/// Default number of log entries kept per run.
pub const RECENT_LOG_CAPACITY: usize = 10;

/// Record of one scored example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationLogEntry {
    pub prompt: String,
    pub predicted_answer: String,
    pub expected_answer: String,
    pub is_correct: bool,
    pub choices: Vec<String>,
    pub question: Option<String>,
    pub kind: ExampleKind,
    pub subject: Option<String>,
    pub format: Option<SourceFormat>,
    /// Run throughput at the time this entry was recorded.
    pub latency: f64,
    /// Character count of prompt plus response.
    pub token_count: usize,
}

/// Fixed-capacity log of the most recent entries, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentLog {
    entries: VecDeque<EvaluationLogEntry>,
    capacity: usize,
}

impl RecentLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest once the log is full.
    pub fn push(&mut self, entry: EvaluationLogEntry) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &EvaluationLogEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&EvaluationLogEntry> {
        self.entries.back()
    }
}

impl Default for RecentLog {
    fn default() -> Self {
        Self::new(RECENT_LOG_CAPACITY)
    }
}

/// Snapshot of a run so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    /// `tokens_processed * 1000 / elapsed_ms`; a throughput figure kept under
    /// this name and scaling for downstream compatibility.
    pub latency: f64,
    /// Correct over scored, in `[0, 1]`.
    pub accuracy: f64,
    /// Characters of prompt and response text seen so far.
    pub tokens_processed: usize,
    /// Resident memory in bytes, 0 when unavailable.
    pub memory_usage: u64,
    /// Seconds since the run started.
    pub eval_time: f64,
    pub logs: RecentLog,
}

/// Source for the `memory_usage` metric.
pub trait MemoryProbe: Send + Sync {
    /// Bytes currently in use, or 0 if the platform does not say.
    fn used_bytes(&self) -> u64;
}

/// Resident set size of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessMemory;

impl MemoryProbe for ProcessMemory {
    fn used_bytes(&self) -> u64 {
        read_vm_rss()
    }
}

#[cfg(target_os = "linux")]
fn read_vm_rss() -> u64 {
    std::fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|status| {
            status
                .lines()
                .find(|line| line.starts_with("VmRSS:"))
                .and_then(|line| {
                    line.trim_start_matches("VmRSS:")
                        .trim()
                        .trim_end_matches("kB")
                        .trim()
                        .parse::<u64>()
                        .ok()
                })
                .map(|kb| kb * 1024)
        })
        .unwrap_or(0)
}

#[cfg(not(target_os = "linux"))]
fn read_vm_rss() -> u64 {
    0
}

/// `tokens * 1000 / elapsed_ms`, or 0 before any time has passed.
pub fn throughput(tokens: usize, elapsed_ms: f64) -> f64 {
    if elapsed_ms > 0.0 {
        tokens as f64 * 1000.0 / elapsed_ms
    } else {
        0.0
    }
}

/// Accumulates counters across one run.
pub struct MetricsAggregator {
    correct: usize,
    scored: usize,
    total_tokens: usize,
    started: Instant,
    logs: RecentLog,
    memory: Box<dyn MemoryProbe>,
}

impl MetricsAggregator {
    /// Start the clock with the default log capacity and process memory probe.
    pub fn new() -> Self {
        Self::with_options(RECENT_LOG_CAPACITY, Box::new(ProcessMemory))
    }

    pub fn with_options(log_capacity: usize, memory: Box<dyn MemoryProbe>) -> Self {
        Self {
            correct: 0,
            scored: 0,
            total_tokens: 0,
            started: Instant::now(),
            logs: RecentLog::new(log_capacity),
            memory,
        }
    }

    /// Fold one scored example into the run and return the new snapshot.
    pub fn record(
        &mut self,
        example: &ParsedExample,
        raw_response: &str,
        score: &Score,
    ) -> EvaluationMetrics {
        let token_count = example.prompt.chars().count() + raw_response.chars().count();
        self.total_tokens += token_count;
        self.scored += 1;
        if score.is_correct {
            self.correct += 1;
        }

        let elapsed_ms = self.elapsed_ms();
        self.logs.push(EvaluationLogEntry {
            prompt: example.prompt.clone(),
            predicted_answer: score.predicted_answer.clone(),
            expected_answer: example.expected_answer.clone(),
            is_correct: score.is_correct,
            choices: example.choices.clone(),
            question: example.question.clone(),
            kind: example.kind,
            subject: example.subject.clone(),
            format: example.format,
            latency: throughput(self.total_tokens, elapsed_ms),
            token_count,
        });

        self.snapshot_at(elapsed_ms)
    }

    /// Snapshot without recording anything.
    pub fn snapshot(&self) -> EvaluationMetrics {
        self.snapshot_at(self.elapsed_ms())
    }

    pub fn correct(&self) -> usize {
        self.correct
    }

    pub fn scored(&self) -> usize {
        self.scored
    }

    fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    fn snapshot_at(&self, elapsed_ms: f64) -> EvaluationMetrics {
        let accuracy = if self.scored == 0 {
            0.0
        } else {
            self.correct as f64 / self.scored as f64
        };
        EvaluationMetrics {
            latency: throughput(self.total_tokens, elapsed_ms),
            accuracy,
            tokens_processed: self.total_tokens,
            memory_usage: self.memory.used_bytes(),
            eval_time: elapsed_ms / 1000.0,
            logs: self.logs.clone(),
        }
    }
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new()
    }
}
