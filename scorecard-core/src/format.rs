//! Benchmark record classification.
//!
//! Dataset files mix several record shapes. Each shape has a structural
//! validator; validators run in a fixed priority order and the first one that
//! accepts the record wins. A record no validator accepts comes back as
//! [`Resolution::Unrecognized`] so the caller decides whether to skip it,
//! score it anyway, or abort.

use crate::prompt::{NumericStyle, PromptTemplate, build_prompt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Letters are assigned A..Z, so at most 26 choices are supported.
pub const MAX_CHOICES: usize = 26;

/// Dataset identifier marker that selects the worked-example numeric prompt.
const WORKED_EXAMPLE_DATASET_MARKER: &str = "MathQA-TR";

/// Question characters that select the worked-example numeric prompt.
const WORKED_EXAMPLE_DIACRITICS: &[char] = &['ç', 'ğ', 'ı', 'ö', 'ş', 'ü'];

/// A raw record, one JSON object per dataset line.
pub type RawExample = Value;

/// How an example is answered and scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExampleKind {
    MultipleChoice,
    Math,
}

/// The record shape an example was recognised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// `gold_index` + `choices` list.
    TruthfulQa,
    /// `choices.text` list + `answerKey`.
    Arc,
    /// `answer` + `equation`, numeric answer.
    MathQa,
    /// `choices` list + numeric `answer` index.
    StandardChoice,
    /// `activity_label` + `ctx` + `endings` + `label`.
    HellaSwag,
}

/// A classified example with its rendered prompt. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedExample {
    pub prompt: String,
    pub choices: Vec<String>,
    pub expected_answer: String,
    pub kind: ExampleKind,
    pub subject: Option<String>,
    pub question: Option<String>,
    /// `None` only for the degenerate stand-in built for unrecognized records.
    pub format: Option<SourceFormat>,
}

impl ParsedExample {
    /// Empty multiple-choice stand-in for a record no validator accepted.
    ///
    /// Scoring one of these almost always yields a miss; it exists so the
    /// legacy "score everything" policy can still be selected.
    pub fn degenerate(raw: &RawExample) -> Self {
        Self {
            prompt: String::new(),
            choices: Vec::new(),
            expected_answer: String::new(),
            kind: ExampleKind::MultipleChoice,
            subject: text_field(raw, "subject"),
            question: text_field(raw, "question"),
            format: None,
        }
    }
}

/// Outcome of classifying one raw record.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(ParsedExample),
    Unrecognized,
}

impl Resolution {
    pub fn into_example(self) -> Option<ParsedExample> {
        match self {
            Resolution::Resolved(example) => Some(example),
            Resolution::Unrecognized => None,
        }
    }
}

type Validator = fn(&RawExample, &FormatResolver) -> Option<ParsedExample>;

/// Validators in priority order.
const VALIDATORS: [(SourceFormat, Validator); 5] = [
    (SourceFormat::TruthfulQa, truthful_qa),
    (SourceFormat::Arc, arc),
    (SourceFormat::MathQa, math_qa),
    (SourceFormat::StandardChoice, standard_choice),
    (SourceFormat::HellaSwag, hella_swag),
];

/// Classifies raw records for one dataset.
#[derive(Debug, Clone)]
pub struct FormatResolver {
    dataset_id: String,
}

impl FormatResolver {
    /// The dataset identifier feeds the numeric prompt phrasing heuristic.
    pub fn new(dataset_id: impl Into<String>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
        }
    }

    pub fn resolve(&self, raw: &RawExample) -> Resolution {
        for (format, validator) in VALIDATORS {
            if let Some(example) = validator(raw, self) {
                tracing::trace!(?format, "Record classified");
                return Resolution::Resolved(example);
            }
        }
        Resolution::Unrecognized
    }

    fn numeric_style(&self, question: &str) -> NumericStyle {
        if self.dataset_id.contains(WORKED_EXAMPLE_DATASET_MARKER)
            || question.contains(WORKED_EXAMPLE_DIACRITICS)
        {
            NumericStyle::WorkedExample
        } else {
            NumericStyle::Plain
        }
    }
}

/// Letter for the choice at `index`, or `None` past `Z`.
pub fn choice_letter(index: usize) -> Option<char> {
    if index < MAX_CHOICES {
        Some((b'A' + index as u8) as char)
    } else {
        None
    }
}

/// Letters for `num_choices` choices, `A` onwards, capped at 26.
pub fn choice_letters(num_choices: usize) -> Vec<char> {
    (0..num_choices.min(MAX_CHOICES))
        .filter_map(choice_letter)
        .collect()
}

// ---------------------------------------------------------------------------
// Validators
// ---------------------------------------------------------------------------

fn truthful_qa(raw: &RawExample, _resolver: &FormatResolver) -> Option<ParsedExample> {
    let gold_index = number_index(raw.get("gold_index")?)?;
    let choices = text_list(raw.get("choices")?)?;
    let expected = choice_letter(gold_index)?;
    Some(multiple_choice(raw, choices, expected.to_string(), SourceFormat::TruthfulQa))
}

fn arc(raw: &RawExample, _resolver: &FormatResolver) -> Option<ParsedExample> {
    let choices = text_list(raw.get("choices")?.as_object()?.get("text")?)?;
    let expected = value_text(raw.get("answerKey")?)?;
    Some(multiple_choice(raw, choices, expected, SourceFormat::Arc))
}

fn math_qa(raw: &RawExample, resolver: &FormatResolver) -> Option<ParsedExample> {
    let answer = raw.get("answer").filter(|v| is_truthy(v))?;
    raw.get("equation").filter(|v| is_truthy(v))?;
    let expected = value_text(answer)?;
    let question = text_field(raw, "question");
    let question_text = question.as_deref().unwrap_or_default();
    let prompt = build_prompt(&PromptTemplate::Numeric {
        question: question_text,
        style: resolver.numeric_style(question_text),
    });
    Some(ParsedExample {
        prompt,
        choices: Vec::new(),
        expected_answer: expected,
        kind: ExampleKind::Math,
        subject: text_field(raw, "subject"),
        question,
        format: Some(SourceFormat::MathQa),
    })
}

fn standard_choice(raw: &RawExample, _resolver: &FormatResolver) -> Option<ParsedExample> {
    let choices = text_list(raw.get("choices")?)?;
    let answer = number_index(raw.get("answer")?)?;
    let expected = choice_letter(answer)?;
    Some(multiple_choice(
        raw,
        choices,
        expected.to_string(),
        SourceFormat::StandardChoice,
    ))
}

fn hella_swag(raw: &RawExample, _resolver: &FormatResolver) -> Option<ParsedExample> {
    raw.get("activity_label").filter(|v| is_truthy(v))?;
    let choices = text_list(raw.get("endings")?)?;
    let label = index_value(raw.get("label")?)?;
    let expected = choice_letter(label)?;
    let context = text_field(raw, "ctx").unwrap_or_default();
    let prompt = build_prompt(&PromptTemplate::ContextCompletion {
        context: &context,
        choices: &choices,
    });
    Some(ParsedExample {
        prompt,
        choices,
        expected_answer: expected.to_string(),
        kind: ExampleKind::MultipleChoice,
        subject: text_field(raw, "subject"),
        question: text_field(raw, "question"),
        format: Some(SourceFormat::HellaSwag),
    })
}

fn multiple_choice(
    raw: &RawExample,
    choices: Vec<String>,
    expected_answer: String,
    format: SourceFormat,
) -> ParsedExample {
    let question = text_field(raw, "question");
    let prompt = build_prompt(&PromptTemplate::MultipleChoice {
        question: question.as_deref().unwrap_or_default(),
        choices: &choices,
    });
    ParsedExample {
        prompt,
        choices,
        expected_answer,
        kind: ExampleKind::MultipleChoice,
        subject: text_field(raw, "subject"),
        question,
        format: Some(format),
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// A JSON array rendered as choice strings. Rejects more choices than there
/// are letters.
fn text_list(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    if items.len() > MAX_CHOICES {
        return None;
    }
    items.iter().map(value_text).collect()
}

/// Scalars as display text. Strings are taken verbatim, numbers and booleans
/// use their JSON spelling. Null, arrays and objects have no text form.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn text_field(raw: &RawExample, key: &str) -> Option<String> {
    raw.get(key).and_then(value_text)
}

/// A non-negative integer index, given either as a number or a numeric string.
fn index_value(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        _ => number_index(value),
    }
}

/// A JSON number usable as an index. `1.0` counts, `1.5` and `-1` do not.
fn number_index(value: &Value) -> Option<usize> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(i) = n.as_u64() {
        return usize::try_from(i).ok();
    }
    let f = n.as_f64()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 {
        Some(f as usize)
    } else {
        None
    }
}

/// Loose truthiness: present fields that are null, false, zero or an empty
/// string do not count as present.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn resolve(raw: Value) -> ParsedExample {
        FormatResolver::new("local:test.jsonl")
            .resolve(&raw)
            .into_example()
            .expect("record should resolve")
    }

    #[test]
    fn test_choice_letters_cover_alphabet() {
        assert_eq!(choice_letters(3), vec!['A', 'B', 'C']);
        assert_eq!(choice_letters(26).last(), Some(&'Z'));
        assert_eq!(choice_letters(40).len(), MAX_CHOICES);
        assert_eq!(choice_letter(26), None);
    }

    #[test]
    fn test_truthful_qa_record() {
        let example = resolve(json!({
            "question": "Is the sky green?",
            "choices": ["Yes", "No", "Sometimes"],
            "gold_index": 1
        }));
        assert_eq!(example.format, Some(SourceFormat::TruthfulQa));
        assert_eq!(example.expected_answer, "B");
        assert_eq!(example.kind, ExampleKind::MultipleChoice);
        assert_eq!(example.choices.len(), 3);
        assert!(example.prompt.contains("C) Sometimes"));
    }

    #[test]
    fn test_arc_record_uses_answer_key() {
        let example = resolve(json!({
            "question": "Which is a mammal?",
            "choices": {"text": ["Shark", "Whale", "Trout", "Eel"], "label": ["A", "B", "C", "D"]},
            "answerKey": "B"
        }));
        assert_eq!(example.format, Some(SourceFormat::Arc));
        assert_eq!(example.expected_answer, "B");
        assert_eq!(example.choices, vec!["Shark", "Whale", "Trout", "Eel"]);
    }

    #[test]
    fn test_math_qa_record_and_locale_heuristic() {
        let plain = resolve(json!({"question": "2*3?", "answer": 6, "equation": "2*3"}));
        assert_eq!(plain.kind, ExampleKind::Math);
        assert_eq!(plain.expected_answer, "6");
        assert!(plain.prompt.ends_with("no explanation:"));

        let by_diacritic = resolve(json!({"question": "Üç kere iki kaç?", "answer": "6", "equation": "3*2"}));
        assert!(by_diacritic.prompt.contains("just write '4'"));

        let by_dataset = FormatResolver::new("local:MathQA-TR.jsonl")
            .resolve(&json!({"question": "2*3?", "answer": "6", "equation": "2*3"}))
            .into_example()
            .unwrap();
        assert!(by_dataset.prompt.contains("just write '4'"));
    }

    #[test]
    fn test_standard_record_with_numeric_answer() {
        let example = resolve(json!({
            "question": "Pick one",
            "choices": ["x", "y"],
            "answer": 0,
            "subject": "algebra"
        }));
        assert_eq!(example.format, Some(SourceFormat::StandardChoice));
        assert_eq!(example.expected_answer, "A");
        assert_eq!(example.subject.as_deref(), Some("algebra"));
    }

    #[test]
    fn test_hellaswag_record_prepends_context() {
        let example = resolve(json!({
            "activity_label": "Cooking",
            "ctx": "A chef cracks an egg.",
            "endings": ["into a bowl", "into the sky", "onto a car", "under a rug"],
            "label": "0"
        }));
        assert_eq!(example.format, Some(SourceFormat::HellaSwag));
        assert_eq!(example.expected_answer, "A");
        assert!(example.prompt.contains("Context: A chef cracks an egg."));
    }

    #[test]
    fn test_priority_gold_index_beats_standard() {
        let example = resolve(json!({
            "question": "q",
            "choices": ["a", "b", "c"],
            "gold_index": 2,
            "answer": 0
        }));
        assert_eq!(example.format, Some(SourceFormat::TruthfulQa));
        assert_eq!(example.expected_answer, "C");
    }

    #[test]
    fn test_zero_math_answer_is_not_math() {
        let resolution =
            FormatResolver::new("x:y").resolve(&json!({"question": "q", "answer": 0, "equation": "0"}));
        assert_eq!(resolution, Resolution::Unrecognized);
    }

    #[test]
    fn test_unrecognized_record() {
        let raw = json!({"prompt": "free text", "subject": "misc"});
        assert_eq!(FormatResolver::new("x:y").resolve(&raw), Resolution::Unrecognized);

        let degenerate = ParsedExample::degenerate(&raw);
        assert!(degenerate.prompt.is_empty());
        assert!(degenerate.expected_answer.is_empty());
        assert_eq!(degenerate.subject.as_deref(), Some("misc"));
        assert_eq!(degenerate.format, None);
    }

    #[test]
    fn test_integral_float_indices_resolve() {
        let truthful = resolve(json!({"choices": ["a", "b", "c"], "gold_index": 1.0}));
        assert_eq!(truthful.format, Some(SourceFormat::TruthfulQa));
        assert_eq!(truthful.expected_answer, "B");

        let standard = resolve(json!({"choices": ["a", "b"], "answer": 1.0}));
        assert_eq!(standard.format, Some(SourceFormat::StandardChoice));
        assert_eq!(standard.expected_answer, "B");

        let fractional = json!({"choices": ["a", "b"], "answer": 1.5});
        assert_eq!(FormatResolver::new("x:y").resolve(&fractional), Resolution::Unrecognized);
        let text_answer = json!({"choices": ["a", "b"], "answer": "1"});
        assert_eq!(FormatResolver::new("x:y").resolve(&text_answer), Resolution::Unrecognized);
    }

    #[test]
    fn test_gold_index_out_of_letter_range_is_rejected() {
        let raw = json!({"question": "q", "choices": ["a"], "gold_index": 30});
        assert_eq!(FormatResolver::new("x:y").resolve(&raw), Resolution::Unrecognized);
    }
}
