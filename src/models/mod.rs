pub mod exam;

pub use exam::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub struct ExtractError(pub String);

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExtractError: {}", self.0)
    }
}

impl Error for ExtractError {}

#[derive(Debug, Deserialize)]
pub struct ParseQuery {
    pub filename: Option<String>,
}

/// Pre-extracted blocks posted by an external converter
#[derive(Debug, Deserialize)]
pub struct ParseBlocksRequest {
    #[serde(default)]
    pub filename: String,
    pub blocks: Vec<Block>,
}

/// Draft plus what the admin should review before saving it
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseReport {
    pub source: String,
    pub parsed_at: DateTime<Utc>,
    pub question_count: usize,
    pub warnings: Vec<String>,
    pub draft: ExamDraft,
}
