//! Correctness rules per example kind.

use crate::extract::{extract_choice, extract_number, leading_number};
use crate::format::{ExampleKind, ParsedExample};
use serde::{Deserialize, Serialize};

/// Absolute tolerance for numeric answers (exclusive).
pub const NUMERIC_TOLERANCE: f64 = 0.01;

/// Prediction recorded when no number can be found in the response.
pub const NO_NUMERIC_ANSWER: &str = "No numeric answer found";

/// Scored prediction for one example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub predicted_answer: String,
    pub is_correct: bool,
}

/// Extract and score `raw_response` against `example`.
pub fn score_response(example: &ParsedExample, raw_response: &str) -> Score {
    match example.kind {
        ExampleKind::MultipleChoice => score_choice(
            extract_choice(raw_response, example.choices.len()),
            raw_response,
            &example.expected_answer,
        ),
        ExampleKind::Math => score_numeric(
            extract_number(raw_response).as_deref(),
            &example.expected_answer,
        ),
    }
}

/// Case-insensitive letter equality. When extraction found nothing, the
/// trimmed, upper-cased response itself is the prediction.
pub fn score_choice(extracted: Option<char>, raw_response: &str, expected: &str) -> Score {
    let predicted_answer = match extracted {
        Some(letter) => letter.to_ascii_uppercase().to_string(),
        None => raw_response.trim().to_uppercase(),
    };
    let is_correct = predicted_answer == expected.to_uppercase();
    Score {
        predicted_answer,
        is_correct,
    }
}

/// Numeric equality within [`NUMERIC_TOLERANCE`]. Both sides are read by
/// their leading number, so `"40 km/h"` expects 40. An expected answer that
/// does not start with a number can never be matched.
pub fn score_numeric(extracted: Option<&str>, expected: &str) -> Score {
    let Some(predicted) = extracted else {
        return Score {
            predicted_answer: NO_NUMERIC_ANSWER.to_string(),
            is_correct: false,
        };
    };
    let is_correct = match (leading_number(predicted), leading_number(expected)) {
        (Some(p), Some(e)) => (p - e).abs() < NUMERIC_TOLERANCE,
        _ => false,
    };
    Score {
        predicted_answer: predicted.to_string(),
        is_correct,
    }
}
