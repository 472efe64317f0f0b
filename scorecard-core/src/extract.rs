//! Answer extraction from free-form model output.
//!
//! Models rarely answer with just the letter or number the prompt asked for.
//! Extraction recovers the structured answer; a miss is `None` and is handled
//! by the scorer.

use crate::format::{MAX_CHOICES, choice_letter};
use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

/// First signed integer or decimal literal. ASCII digits only, so the match
/// always parses as `f64`.
static NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-+]?([0-9]*\.[0-9]+|[0-9]+)").unwrap());

/// Optionally signed decimal at the very start of the text, after leading
/// whitespace, with an optional exponent.
static LEADING_NUMBER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[-+]?([0-9]+\.?[0-9]*|\.[0-9]+)([eE][-+]?[0-9]+)?").unwrap()
});

/// One extractor per choice count, `1..=MAX_CHOICES`.
static CHOICE_EXTRACTORS: LazyLock<Vec<ChoiceExtractor>> = LazyLock::new(|| {
    (1..=MAX_CHOICES)
        .filter_map(ChoiceExtractor::new)
        .collect()
});

/// Compiled letter patterns for a fixed number of choices.
///
/// Patterns are tried in order and the first that matches wins:
/// 1. a standalone allowed letter bounded by word edges
/// 2. an allowed letter right after `(`/`[` or right before `)`/`]`/`.`
/// 3. an allowed letter after "answer"/"choice", optional "is" and colon
/// 4. any allowed letter anywhere
///
/// Matching is ASCII case-insensitive, so word edges treat non-Latin scripts
/// as separators.
#[derive(Debug, Clone)]
pub struct ChoiceExtractor {
    patterns: Vec<Regex>,
}

impl ChoiceExtractor {
    /// Returns `None` when there are no choices to pick from.
    pub fn new(num_choices: usize) -> Option<Self> {
        let last = choice_letter(num_choices.min(MAX_CHOICES).checked_sub(1)?)?;
        let class = format!("[A-{last}]");
        let sources = [
            format!(r"\b({class})\b"),
            format!(r"[\(\[]({class})|({class})[\)\]\.]"),
            format!(r"(?:answer|choice)\s*(?:is)?\s*:?\s*({class})"),
            format!("({class})"),
        ];
        let patterns = sources
            .iter()
            .map(|source| {
                RegexBuilder::new(source)
                    .case_insensitive(true)
                    .unicode(false)
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()
            .ok()?;
        Some(Self { patterns })
    }

    /// The upper-cased letter, or `None` if no allowed letter appears at all.
    pub fn extract(&self, raw: &str) -> Option<char> {
        self.patterns.iter().find_map(|pattern| {
            let captures = pattern.captures(raw)?;
            let letter = captures
                .iter()
                .skip(1)
                .flatten()
                .next()?
                .as_str()
                .chars()
                .next()?;
            Some(letter.to_ascii_uppercase())
        })
    }
}

/// Recover a choice letter from `raw` given `num_choices` options.
///
/// Extractors are compiled on first use and shared across calls.
pub fn extract_choice(raw: &str, num_choices: usize) -> Option<char> {
    let slot = num_choices.min(MAX_CHOICES).checked_sub(1)?;
    CHOICE_EXTRACTORS.get(slot)?.extract(raw)
}

/// Recover the first number literal from `raw`, as written.
pub fn extract_number(raw: &str) -> Option<String> {
    NUMBER_PATTERN
        .find(raw)
        .map(|found| found.as_str().to_string())
}

/// Numeric value of the text's leading number, ignoring whatever follows:
/// `"40 km/h"` is 40 and `"1,200"` is 1. Text that does not start with a
/// number has no value.
pub fn leading_number(text: &str) -> Option<f64> {
    LEADING_NUMBER_PATTERN
        .find(text)
        .and_then(|found| found.as_str().trim().parse().ok())
}
