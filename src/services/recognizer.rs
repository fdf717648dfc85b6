use log::{debug, info};

use crate::config::RecognizerConfig;
use crate::constants;
use crate::models::{AnswerKeyEntry, Block, ExamDraft, ExamOption, Question};
use crate::services::markers::{
    detect_answer, detect_duration, extract_options, is_question_start, is_solution_start,
    strip_label_prefix,
};
use crate::services::smart_join::smart_join;
use crate::utils::truncate_text;

/// Where the recognizer is inside the current question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognizerState {
    ReadingQuestionBody,
    ReadingSolutionBody,
}

/// What a consumed block turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRole {
    QuestionStart,
    SolutionStart,
    OptionLine,
    BodyContinuation,
    /// No text and no image
    Skipped,
}

/// Segments a block stream into an [`ExamDraft`].
///
/// Feed blocks in document order with [`consume`](Self::consume), then call
/// [`finish`](Self::finish). Every call to `finish` yields a fresh draft; nothing
/// is shared between recognizers.
pub struct ExamRecognizer<'a> {
    config: &'a RecognizerConfig,
    state: RecognizerState,
    current: Option<QuestionBuilder>,
    counter: u32,
    questions: Vec<Question>,
    answers: Vec<AnswerKeyEntry>,
    /// Plain text of every block, for duration sniffing
    full_text: String,
    /// First block before any question, used as a title fallback
    heading: Option<String>,
    preamble_blocks: usize,
}

impl<'a> ExamRecognizer<'a> {
    pub fn new(config: &'a RecognizerConfig) -> Self {
        Self {
            config,
            state: RecognizerState::ReadingQuestionBody,
            current: None,
            counter: 0,
            questions: Vec::new(),
            answers: Vec::new(),
            full_text: String::new(),
            heading: None,
            preamble_blocks: 0,
        }
    }

    pub fn state(&self) -> RecognizerState {
        self.state
    }

    /// Classify one block and route its content into the current question.
    pub fn consume(&mut self, block: &Block) -> BlockRole {
        if block.is_empty() {
            return BlockRole::Skipped;
        }
        if !self.full_text.is_empty() {
            self.full_text.push('\n');
        }
        self.full_text.push_str(&block.plain_text);

        if let Some(start) = is_question_start(&block.plain_text) {
            self.flush();
            self.state = RecognizerState::ReadingQuestionBody;
            let mut builder = QuestionBuilder::new(start.number);
            builder.add_body(strip_label_prefix(&block.markup, &start.label));
            self.current = Some(builder);
            return BlockRole::QuestionStart;
        }

        if is_solution_start(&block.plain_text).is_some() {
            self.state = RecognizerState::ReadingSolutionBody;
            return BlockRole::SolutionStart;
        }

        if self.state == RecognizerState::ReadingSolutionBody {
            match self.current.as_mut() {
                Some(builder) => builder.add_solution(block.markup.clone()),
                None => self.note_preamble(block),
            }
            return BlockRole::BodyContinuation;
        }

        if let Some(options) = extract_options(&block.plain_text, &self.config.option_labels) {
            match self.current.as_mut() {
                // one options line per question; a later one replaces it
                Some(builder) => builder.options = options,
                None => self.note_preamble(block),
            }
            return BlockRole::OptionLine;
        }

        match self.current.as_mut() {
            Some(builder) => builder.add_body(block.markup.clone()),
            None => self.note_preamble(block),
        }
        BlockRole::BodyContinuation
    }

    /// Flush the last question and assemble the draft.
    pub fn finish(mut self, filename: &str) -> ExamDraft {
        self.flush();

        let title = derive_title(filename, self.heading.as_deref());
        let duration_minutes = detect_duration(&self.full_text)
            .unwrap_or(self.config.default_duration_minutes)
            .max(1);

        if self.preamble_blocks > 0 {
            debug!("Dropped {} preamble blocks before the first question", self.preamble_blocks);
        }
        info!(
            "Recognized exam '{}': {} questions, {} minutes",
            title,
            self.questions.len(),
            duration_minutes
        );

        ExamDraft {
            title,
            duration_minutes,
            questions: self.questions,
            answers: self.answers,
        }
    }

    fn note_preamble(&mut self, block: &Block) {
        self.preamble_blocks += 1;
        if self.heading.is_none() && !block.plain_text.is_empty() {
            self.heading = Some(block.plain_text.clone());
        }
    }

    fn flush(&mut self) {
        let Some(builder) = self.current.take() else {
            return;
        };
        self.counter += 1;
        let (question, answer) = builder.build(self.counter, self.config);
        self.questions.push(question);
        self.answers.push(answer);
    }
}

/// Accumulates one question between its header and the next one
struct QuestionBuilder {
    header_number: Option<u32>,
    body: Vec<String>,
    solution: Vec<String>,
    options: Vec<ExamOption>,
}

impl QuestionBuilder {
    fn new(header_number: Option<u32>) -> Self {
        Self {
            header_number,
            body: Vec::new(),
            solution: Vec::new(),
            options: Vec::new(),
        }
    }

    fn add_body(&mut self, markup: String) {
        if !markup.trim().is_empty() {
            self.body.push(markup);
        }
    }

    fn add_solution(&mut self, markup: String) {
        if !markup.trim().is_empty() {
            self.solution.push(markup);
        }
    }

    fn build(self, number: u32, config: &RecognizerConfig) -> (Question, AnswerKeyEntry) {
        let id = Question::generate_id(number);
        let text = smart_join(&self.body, config.join_policy, config.long_fragment_chars);
        let detected_options = !self.options.is_empty();
        let options = complete_options(self.options, config);

        let solution = smart_join(&self.solution, config.join_policy, config.long_fragment_chars);
        let detected_answer = detect_answer(&solution, &config.option_labels);
        let correct_option_id = detected_answer
            .clone()
            .unwrap_or_else(|| config.first_label().to_string());
        let solution_text = if solution.trim().is_empty() {
            config.missing_solution_text.clone()
        } else {
            solution
        };

        debug!(
            "Question {} (header {:?}): '{}', options detected: {}, answer {} ({})",
            number,
            self.header_number,
            truncate_text(&text, 40),
            detected_options,
            correct_option_id,
            if detected_answer.is_some() { "detected" } else { "default" }
        );

        let answer = AnswerKeyEntry {
            question_id: id.clone(),
            correct_option_id,
            solution_text,
        };
        let question = Question {
            id,
            number,
            text,
            options,
        };
        (question, answer)
    }
}

/// Exactly one option per configured label, in label order. Labels that were
/// not found (or found empty) get the placeholder text; duplicates keep the first.
fn complete_options(found: Vec<ExamOption>, config: &RecognizerConfig) -> Vec<ExamOption> {
    config
        .option_labels
        .iter()
        .map(|label| {
            let text = found
                .iter()
                .find(|o| &o.id == label && !o.text.is_empty())
                .map(|o| o.text.clone())
                .unwrap_or_else(|| config.missing_option_text.clone());
            ExamOption {
                id: label.clone(),
                text,
            }
        })
        .collect()
}

/// Title from the file name (directory and a supported extension removed),
/// else the document heading.
pub fn derive_title(filename: &str, heading: Option<&str>) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    let stem = match base.rsplit_once('.') {
        Some((stem, ext))
            if constants::SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| ext.eq_ignore_ascii_case(s)) =>
        {
            stem.trim()
        }
        _ => base,
    };
    if !stem.is_empty() {
        return stem.to_string();
    }
    heading
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| constants::UNTITLED_EXAM.to_string())
}

/// Recognize a whole block sequence in one call.
pub fn parse_exam(blocks: &[Block], filename: &str, config: &RecognizerConfig) -> ExamDraft {
    let mut recognizer = ExamRecognizer::new(config);
    for block in blocks {
        recognizer.consume(block);
    }
    recognizer.finish(filename)
}
