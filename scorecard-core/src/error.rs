//! Error types for the scorecard-core crate.
//!
//! Only fatal conditions live here. An answer that cannot be extracted from
//! model output is an `Option::None` handled by the scorer, never an error.

use thiserror::Error;

/// Top-level error type for evaluation runs.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Failed to load dataset: {0}")]
    DatasetFetch(String),

    #[error("Invalid dataset identifier '{0}': expected 'provider:filename'")]
    InvalidDatasetId(String),

    #[error("Malformed record on line {line}: {source}")]
    MalformedRecord {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unrecognized record format at example {index}")]
    UnrecognizedFormat { index: usize },

    #[error("Dataset contains no examples")]
    EmptyDataset,

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Model load error: {0}")]
    ModelLoad(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl EvalError {
    pub fn dataset_fetch(msg: impl Into<String>) -> Self {
        Self::DatasetFetch(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    pub fn model_load(msg: impl Into<String>) -> Self {
        Self::ModelLoad(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EvalError>;

impl From<figment::Error> for EvalError {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_record_message_names_line() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = EvalError::MalformedRecord { line: 7, source };
        assert!(err.to_string().starts_with("Malformed record on line 7"));
    }

    #[test]
    fn test_dataset_fetch_message() {
        let err = EvalError::dataset_fetch("Not Found");
        assert_eq!(err.to_string(), "Failed to load dataset: Not Found");
    }
}
