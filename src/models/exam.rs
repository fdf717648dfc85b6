use serde::{Deserialize, Serialize};

/// Question ID format: q_{uuid}_{number}
/// Example: "q_5f0c1d3e9a8b4c7d8e6f5a4b3c2d1e0f_3"
pub type QuestionId = String;
pub type OptionLabel = String;

/// One paragraph-level node yielded by the block extractor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Trimmed text content
    pub plain_text: String,
    /// Inline-formatted content, may carry `<img>` references
    pub markup: String,
    #[serde(default)]
    pub has_image: bool,
}

/// One labeled choice of a question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamOption {
    pub id: OptionLabel,
    /// Option content, may contain `$...$` math
    pub text: String,
}

/// A numbered multiple-choice question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    /// 1-based position in the exam
    pub number: u32,
    /// Question body markup, possibly multi-paragraph with images
    pub text: String,
    /// Always one entry per configured label, in label order
    pub options: Vec<ExamOption>,
}

/// Correct option and worked solution for one question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerKeyEntry {
    pub question_id: QuestionId,
    pub correct_option_id: OptionLabel,
    pub solution_text: String,
}

/// Structured exam reconstructed from a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamDraft {
    pub title: String,
    pub duration_minutes: u32,
    pub questions: Vec<Question>,
    /// One entry per question, same order
    pub answers: Vec<AnswerKeyEntry>,
}

impl Block {
    /// Build a block from extractor output; `has_image` is derived from the markup.
    pub fn new(plain_text: impl Into<String>, markup: impl Into<String>) -> Self {
        let markup = markup.into();
        let has_image = markup.contains("<img");
        Self {
            plain_text: plain_text.into().trim().to_string(),
            markup,
            has_image,
        }
    }

    /// Trim and re-derive a block from an external converter. A `hasImage`
    /// the converter set is kept even when the markup has no `<img>`.
    pub fn normalized(self) -> Self {
        let has_image = self.has_image || self.markup.contains("<img");
        Self {
            has_image,
            ..Self::new(self.plain_text, self.markup)
        }
    }

    /// Block whose markup is the text itself.
    pub fn from_text(text: &str) -> Self {
        Self::new(text, text.trim())
    }

    /// Blocks with neither text nor image carry nothing to recognize.
    pub fn is_empty(&self) -> bool {
        self.plain_text.is_empty() && !self.has_image
    }
}

impl Question {
    /// Generate unique question ID
    pub fn generate_id(number: u32) -> QuestionId {
        format!("q_{}_{}", uuid::Uuid::new_v4().simple(), number)
    }

    pub fn option_labels(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|o| o.id.as_str())
    }
}

impl ExamDraft {
    pub fn answer_for(&self, question_id: &str) -> Option<&AnswerKeyEntry> {
        self.answers.iter().find(|a| a.question_id == question_id)
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
