use std::collections::{HashMap, HashSet};

use crate::config::RecognizerConfig;
use crate::models::{ExamDraft, Question};

/// Validation result
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub code: String,
    pub message: String,
    pub question_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub code: String,
    pub message: String,
    pub question_id: Option<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, code: &str, message: &str, question_id: Option<String>) {
        self.is_valid = false;
        self.errors.push(ValidationError {
            code: code.to_string(),
            message: message.to_string(),
            question_id,
        });
    }

    pub fn add_warning(&mut self, code: &str, message: &str, question_id: Option<String>) {
        self.warnings.push(ValidationWarning {
            code: code.to_string(),
            message: message.to_string(),
            question_id,
        });
    }

    /// Errors then warnings as "[CODE] message" lines for reports.
    pub fn messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(|e| format!("[{}] {}", e.code, e.message))
            .chain(self.warnings.iter().map(|w| format!("[{}] {}", w.code, w.message)))
            .collect()
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Check math delimiters and braces in markup
pub fn validate_latex(content: &str) -> Vec<String> {
    let mut errors = Vec::new();

    let mut dollars = 0usize;
    let mut escaped = false;
    for c in content.chars() {
        match c {
            '\\' => escaped = !escaped,
            '$' if !escaped => dollars += 1,
            _ => escaped = false,
        }
        if c == '$' {
            escaped = false;
        }
    }
    if dollars % 2 != 0 {
        errors.push("Unclosed inline math delimiter ($)".to_string());
    }

    let unclosed_braces = content.matches('{').count().saturating_sub(content.matches('}').count());
    if unclosed_braces > 0 {
        errors.push(format!("{} unclosed braces '{{'", unclosed_braces));
    }

    errors
}

/// Check the draft's structural contract and flag what needs manual review.
pub fn validate_draft(draft: &ExamDraft, config: &RecognizerConfig) -> ValidationResult {
    let mut result = ValidationResult::new();

    if draft.is_empty() {
        result.add_warning(
            "NO_QUESTIONS",
            "No questions were recognized; enter them manually",
            None,
        );
    }

    if draft.duration_minutes == 0 {
        result.add_error("DURATION", "Duration must be at least one minute", None);
    }

    if draft.questions.len() != draft.answers.len() {
        result.add_error(
            "ANSWER_COUNT",
            &format!(
                "{} questions but {} answer key entries",
                draft.questions.len(),
                draft.answers.len()
            ),
            None,
        );
    }

    let mut answers_by_question: HashMap<&str, usize> = HashMap::new();
    for answer in &draft.answers {
        *answers_by_question.entry(answer.question_id.as_str()).or_default() += 1;
    }

    let mut seen_ids = HashSet::new();
    for (idx, question) in draft.questions.iter().enumerate() {
        let qid = Some(question.id.clone());

        if !seen_ids.insert(question.id.as_str()) {
            result.add_error("DUPLICATE_ID", &format!("Duplicate question id {}", question.id), qid.clone());
        }

        let expected_number = idx as u32 + 1;
        if question.number != expected_number {
            result.add_error(
                "NUMBER_SEQUENCE",
                &format!("Question at position {} is numbered {}", expected_number, question.number),
                qid.clone(),
            );
        }

        match answers_by_question.get(question.id.as_str()) {
            None => result.add_error(
                "MISSING_ANSWER",
                &format!("Question {} has no answer key entry", question.number),
                qid.clone(),
            ),
            Some(count) if *count > 1 => result.add_error(
                "DUPLICATE_ANSWER",
                &format!("Question {} has {} answer key entries", question.number, count),
                qid.clone(),
            ),
            _ => {}
        }

        validate_question(question, config, &mut result);
    }

    for answer in &draft.answers {
        let Some(question) = draft.questions.iter().find(|q| q.id == answer.question_id) else {
            result.add_error(
                "ORPHAN_ANSWER",
                &format!("Answer key entry for unknown question {}", answer.question_id),
                Some(answer.question_id.clone()),
            );
            continue;
        };

        if !question.option_labels().any(|l| l == answer.correct_option_id) {
            result.add_error(
                "UNKNOWN_CORRECT_OPTION",
                &format!(
                    "Question {}: correct option '{}' is not one of its options",
                    question.number, answer.correct_option_id
                ),
                Some(question.id.clone()),
            );
        }

        if answer.solution_text.trim().is_empty() || answer.solution_text == config.missing_solution_text {
            result.add_warning(
                "MISSING_SOLUTION",
                &format!("Question {} has no solution; answer defaulted or must be checked", question.number),
                Some(question.id.clone()),
            );
        }

        for error in validate_latex(&answer.solution_text) {
            result.add_warning(
                "LATEX_SYNTAX",
                &format!("Question {} solution: {}", question.number, error),
                Some(question.id.clone()),
            );
        }
    }

    result
}

fn validate_question(question: &Question, config: &RecognizerConfig, result: &mut ValidationResult) {
    let qid = Some(question.id.clone());

    let labels: Vec<&str> = question.option_labels().collect();
    let expected: Vec<&str> = config.option_labels.iter().map(String::as_str).collect();
    if labels != expected {
        result.add_error(
            "OPTION_LABELS",
            &format!(
                "Question {} options are [{}], expected [{}]",
                question.number,
                labels.join(", "),
                expected.join(", ")
            ),
            qid.clone(),
        );
    }

    let placeholders = question
        .options
        .iter()
        .filter(|o| o.text.trim().is_empty() || o.text == config.missing_option_text)
        .count();
    if placeholders == question.options.len() && !question.options.is_empty() {
        result.add_warning(
            "PLACEHOLDER_OPTIONS",
            &format!("Question {}: no options were recognized", question.number),
            qid.clone(),
        );
    } else if placeholders > 0 {
        result.add_warning(
            "PARTIAL_OPTIONS",
            &format!("Question {}: {} options are placeholders", question.number, placeholders),
            qid.clone(),
        );
    }

    if question.text.trim().is_empty() {
        result.add_warning(
            "EMPTY_TEXT",
            &format!("Question {} has no text", question.number),
            qid.clone(),
        );
    }

    for error in validate_latex(&question.text) {
        result.add_warning(
            "LATEX_SYNTAX",
            &format!("Question {}: {}", question.number, error),
            qid.clone(),
        );
    }
}
