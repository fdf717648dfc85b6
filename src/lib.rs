pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod models;
pub mod server;
pub mod services;
pub mod utils;

pub use config::{Config, RecognizerConfig};
pub use error::{AppError, AppResult};
pub use models::*;
pub use services::{parse_exam, ExamRecognizer};
