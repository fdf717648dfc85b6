use anyhow::{Context, Result};
use std::str::FromStr;

use crate::models::{ExamDraft, Question};

/// Export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Markdown => "md",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Markdown => "text/markdown",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            other => anyhow::bail!("Unknown export format: {}", other),
        }
    }
}

/// Serialize a draft for hand-off to the exam editor or for review.
pub fn export_draft(draft: &ExamDraft, format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Json => export_json(draft),
        ExportFormat::Markdown => Ok(export_markdown(draft).into_bytes()),
    }
}

fn export_json(draft: &ExamDraft) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(draft).context("Failed to serialize exam draft")
}

fn export_markdown(draft: &ExamDraft) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", draft.title));
    output.push_str(&format!("**Thời gian:** {} phút\n\n", draft.duration_minutes));

    for question in &draft.questions {
        output.push_str(&format_question_markdown(question));
    }

    if draft.answers.is_empty() {
        return output;
    }

    output.push_str("## Đáp án\n\n");
    output.push_str("| Câu | Đáp án |\n|---|---|\n");
    for question in &draft.questions {
        if let Some(answer) = draft.answer_for(&question.id) {
            output.push_str(&format!("| {} | {} |\n", question.number, answer.correct_option_id));
        }
    }
    output.push('\n');

    for question in &draft.questions {
        if let Some(answer) = draft.answer_for(&question.id) {
            output.push_str(&format!("### Lời giải câu {}\n\n", question.number));
            output.push_str(&answer.solution_text);
            output.push_str("\n\n");
        }
    }

    output
}

fn format_question_markdown(question: &Question) -> String {
    let mut output = format!("## Câu {}\n\n", question.number);

    if !question.text.is_empty() {
        output.push_str(&question.text);
        output.push_str("\n\n");
    }

    for option in &question.options {
        output.push_str(&format!("- **{}.** {}\n", option.id, option.text));
    }
    output.push('\n');

    output
}
