use log::warn;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub recognizer: RecognizerConfig,
}

/// How consecutive fragments of a question or solution are glued together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
    /// Line break only before images
    Relaxed,
    /// Line break before images and before long prose fragments
    Strict,
}

impl FromStr for JoinPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "relaxed" => Ok(JoinPolicy::Relaxed),
            "strict" => Ok(JoinPolicy::Strict),
            other => Err(format!("unknown join policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizerConfig {
    /// Ordered option labels, e.g. A, B, C, D
    pub option_labels: Vec<String>,
    pub default_duration_minutes: u32,
    pub missing_option_text: String,
    pub missing_solution_text: String,
    pub join_policy: JoinPolicy,
    /// Fragments longer than this (in characters of text) start a new line under `Strict`
    pub long_fragment_chars: usize,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            option_labels: constants::DEFAULT_OPTION_LABELS
                .iter()
                .map(|l| l.to_string())
                .collect(),
            default_duration_minutes: constants::DEFAULT_DURATION_MINUTES,
            missing_option_text: constants::MISSING_OPTION_TEXT.to_string(),
            missing_solution_text: constants::MISSING_SOLUTION_TEXT.to_string(),
            join_policy: JoinPolicy::Strict,
            long_fragment_chars: constants::LONG_FRAGMENT_CHARS,
        }
    }
}

impl RecognizerConfig {
    /// Defaults overlaid with `EXAM_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("EXAM_OPTION_LABELS") {
            match parse_labels(&raw) {
                Some(labels) => config.option_labels = labels,
                None => warn!("Ignoring EXAM_OPTION_LABELS='{}': no usable labels", raw),
            }
        }
        if let Ok(raw) = std::env::var("EXAM_DEFAULT_DURATION") {
            match raw.trim().parse::<u32>() {
                Ok(minutes) if minutes >= 1 => config.default_duration_minutes = minutes,
                _ => warn!("Ignoring EXAM_DEFAULT_DURATION='{}': expected a positive integer", raw),
            }
        }
        if let Ok(text) = std::env::var("EXAM_MISSING_OPTION_TEXT") {
            config.missing_option_text = text;
        }
        if let Ok(text) = std::env::var("EXAM_MISSING_SOLUTION_TEXT") {
            config.missing_solution_text = text;
        }
        if let Ok(raw) = std::env::var("EXAM_JOIN_POLICY") {
            match raw.parse::<JoinPolicy>() {
                Ok(policy) => config.join_policy = policy,
                Err(e) => warn!("Ignoring EXAM_JOIN_POLICY: {}", e),
            }
        }
        if let Ok(raw) = std::env::var("EXAM_LONG_FRAGMENT_CHARS") {
            match raw.trim().parse::<usize>() {
                Ok(chars) if chars > 0 => config.long_fragment_chars = chars,
                _ => warn!("Ignoring EXAM_LONG_FRAGMENT_CHARS='{}'", raw),
            }
        }

        config
    }

    pub fn first_label(&self) -> &str {
        self.option_labels
            .first()
            .map(String::as_str)
            .unwrap_or(constants::DEFAULT_OPTION_LABELS[0])
    }
}

/// Split a comma separated label list, dropping blanks and duplicates.
fn parse_labels(raw: &str) -> Option<Vec<String>> {
    let mut labels: Vec<String> = Vec::new();
    for label in raw.split(',').map(str::trim).filter(|l| !l.is_empty()) {
        if !labels.iter().any(|l| l == label) {
            labels.push(label.to_string());
        }
    }
    if labels.is_empty() { None } else { Some(labels) }
}

impl Default for Config {
    fn default() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| constants::DEFAULT_HOST.to_string());
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(constants::DEFAULT_PORT);

        Self {
            host,
            port,
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(constants::MAX_UPLOAD_BYTES),
            recognizer: RecognizerConfig::from_env(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }
}
