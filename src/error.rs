use actix_web::{HttpResponse, ResponseError};
use std::fmt;

use crate::models::ExtractError;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    /// The block extractor could not read the uploaded document.
    SourceUnreadable(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::SourceUnreadable(msg) => write!(f, "Source unreadable: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let body = serde_json::json!({ "error": self.to_string() });
        match self {
            AppError::BadRequest(_) => HttpResponse::BadRequest().json(body),
            AppError::SourceUnreadable(_) => HttpResponse::UnprocessableEntity().json(body),
        }
    }
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        AppError::SourceUnreadable(err.0)
    }
}

pub type AppResult<T> = Result<T, AppError>;
