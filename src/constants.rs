// src/constants.rs

// Recognizer defaults
pub const DEFAULT_OPTION_LABELS: &[&str] = &["A", "B", "C", "D"];
pub const DEFAULT_DURATION_MINUTES: u32 = 45;
pub const MISSING_OPTION_TEXT: &str = "...";
pub const MISSING_SOLUTION_TEXT: &str = "Chưa có lời giải.";
pub const UNTITLED_EXAM: &str = "Untitled exam";

// Smart join
pub const LINE_BREAK: &str = "<br/>";
pub const LONG_FRAGMENT_CHARS: usize = 80;

// Server defaults
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8081;
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

// DOCX container parts
pub const DOCX_DOCUMENT_PART: &str = "word/document.xml";
pub const DOCX_RELS_PART: &str = "word/_rels/document.xml.rels";
pub const DOCX_PART_PREFIX: &str = "word/";

// Supported inputs
pub const SUPPORTED_EXTENSIONS: &[&str] = &["docx", "json"];
