//! Prompt rendering for classified benchmark examples.

use crate::format::choice_letters;

/// Phrasing used for numeric-answer prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericStyle {
    /// Short "numeric answer only" instruction.
    Plain,
    /// Instruction with a worked micro-example, used for datasets where the
    /// plain phrasing is routinely ignored.
    WorkedExample,
}

/// What to render. Borrowed from the raw record so the resolver does not
/// have to clone fields it only reads once.
#[derive(Debug, Clone, Copy)]
pub enum PromptTemplate<'a> {
    /// Question followed by lettered choices.
    MultipleChoice {
        question: &'a str,
        choices: &'a [String],
    },
    /// Pick the ending that best continues a context sentence.
    ContextCompletion {
        context: &'a str,
        choices: &'a [String],
    },
    /// Question answered with a bare number.
    Numeric {
        question: &'a str,
        style: NumericStyle,
    },
}

/// Render a template into the prompt text sent to the model.
pub fn build_prompt(template: &PromptTemplate<'_>) -> String {
    match *template {
        PromptTemplate::MultipleChoice { question, choices } => format!(
            "Question: {question}\nChoices:\n{}\nAnswer: Please respond with only one of the following letters: {}. DO NOT provide explanations or additional text.\nAnswer: ",
            render_choices(choices),
            allowed_letters(choices.len()),
        ),
        PromptTemplate::ContextCompletion { context, choices } => format!(
            "Question: Select the most appropriate ending for this context.\nContext: {context}\nChoices:\n{}\nIMPORTANT: You must respond with only a single letter ({}). DO NOT write any explanation or additional text.\nAnswer: ",
            render_choices(choices),
            allowed_letters(choices.len()),
        ),
        PromptTemplate::Numeric {
            question,
            style: NumericStyle::Plain,
        } => format!("Question: {question}\nProvide only the numeric answer, no explanation:"),
        PromptTemplate::Numeric {
            question,
            style: NumericStyle::WorkedExample,
        } => format!(
            "Question: {question}\nProvide ONLY a single number as answer. For example: If asked '2+2=?', just write '4'.\nAnswer: "
        ),
    }
}

fn render_choices(choices: &[String]) -> String {
    choice_letters(choices.len())
        .into_iter()
        .zip(choices)
        .map(|(letter, choice)| format!("{letter}) {choice}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// "A, B, C" for three choices.
fn allowed_letters(num_choices: usize) -> String {
    choice_letters(num_choices)
        .iter()
        .map(char::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_multiple_choice_prompt_layout() {
        let choices = strings(&["Paris", "London", "Berlin"]);
        let prompt = build_prompt(&PromptTemplate::MultipleChoice {
            question: "What is the capital of France?",
            choices: &choices,
        });
        assert_eq!(
            prompt,
            "Question: What is the capital of France?\nChoices:\nA) Paris\nB) London\nC) Berlin\n\
             Answer: Please respond with only one of the following letters: A, B, C. \
             DO NOT provide explanations or additional text.\nAnswer: "
        );
    }

    #[test]
    fn test_context_completion_prompt_names_letters() {
        let choices = strings(&["runs away", "sits down"]);
        let prompt = build_prompt(&PromptTemplate::ContextCompletion {
            context: "A dog sees a cat.",
            choices: &choices,
        });
        assert!(prompt.contains("Context: A dog sees a cat.\n"));
        assert!(prompt.contains("A) runs away\nB) sits down\n"));
        assert!(prompt.contains("only a single letter (A, B)"));
        assert!(prompt.ends_with("Answer: "));
    }

    #[test]
    fn test_numeric_styles() {
        let plain = build_prompt(&PromptTemplate::Numeric {
            question: "What is 3*4?",
            style: NumericStyle::Plain,
        });
        assert_eq!(
            plain,
            "Question: What is 3*4?\nProvide only the numeric answer, no explanation:"
        );

        let worked = build_prompt(&PromptTemplate::Numeric {
            question: "3*4 kaç eder?",
            style: NumericStyle::WorkedExample,
        });
        assert!(worked.contains("'2+2=?', just write '4'"));
        assert!(worked.ends_with("\nAnswer: "));
    }
}
