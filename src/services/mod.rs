mod extractor;
pub use extractor::*;

pub mod export;
pub mod markers;
pub mod recognizer;
pub mod smart_join;
pub mod validation;

pub use recognizer::{ExamRecognizer, parse_exam};
