//! Application error taxonomy.
//!
//! Four stable wire codes cover every failure a storefront request can hit.
//! Internal detail is logged and carried on the error, but whether it reaches
//! the response body is the HTTP layer's call (development only).

use std::time::Duration;

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::domain::DomainError;
use crate::template::TemplateError;

/// Wire-visible error classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RenderError,
    DataError,
    NotFound,
    ValidationError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RenderError => "RENDER_ERROR",
            ErrorCode::DataError => "DATA_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("render failed: {0}")]
    Render(String),
    #[error("data fetch failed: {0}")]
    Data(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("data fetch exceeded deadline of {0:?}")]
    Deadline(Duration),
}

impl AppError {
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render(message.into())
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::Data(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Render(_) => ErrorCode::RenderError,
            AppError::Data(_) | AppError::Deadline(_) => ErrorCode::DataError,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Validation(_) => ErrorCode::ValidationError,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Render(_) | AppError::Data(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Deadline(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show outside development.
    pub fn public_message(&self) -> &'static str {
        match self.code() {
            ErrorCode::RenderError => "The page could not be rendered",
            ErrorCode::DataError => "Store data is temporarily unavailable",
            ErrorCode::NotFound => "Page not found",
            ErrorCode::ValidationError => "Invalid store configuration",
        }
    }
}

impl From<DomainError> for AppError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::NotFound { .. } => AppError::NotFound(error.to_string()),
            DomainError::Validation { .. } => AppError::Validation(error.to_string()),
            DomainError::Invariant { .. } => AppError::Data(error.to_string()),
        }
    }
}

impl From<TemplateError> for AppError {
    fn from(error: TemplateError) -> Self {
        match error {
            TemplateError::Parse(_) | TemplateError::Render(_) => {
                AppError::Render(error.to_string())
            }
            TemplateError::Schema(_) => AppError::Validation(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_errors_map_onto_the_taxonomy() {
        let render: AppError = TemplateError::parse("bad tag").into();
        assert_eq!(render.code(), ErrorCode::RenderError);
        assert_eq!(render.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let schema: AppError = TemplateError::schema("bad json").into();
        assert_eq!(schema.code(), ErrorCode::ValidationError);
        assert_eq!(schema.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn deadline_reads_as_a_data_error() {
        let error = AppError::Deadline(Duration::from_millis(3000));
        assert_eq!(error.code(), ErrorCode::DataError);
        assert_eq!(error.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn error_codes_serialize_screaming() {
        let json = serde_json::to_string(&ErrorCode::RenderError).expect("serialize");
        assert_eq!(json, "\"RENDER_ERROR\"");
    }
}
