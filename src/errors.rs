use std::fmt;

use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse
};
use serde::Serialize;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::pdf::RenderError;

#[derive(Debug)]
pub enum AppError {
    ValidationError(Vec<FieldError>),
    NotFound(String),
    RendererUnavailable(String),
    RendererFailure(String),
    TransactionFailure(String),
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ValidationError(errors) => {
                let messages = errors.iter()
                    .map(|e| format!("{}:{}", e.field, e.message))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "validation error: {}", messages)
            }
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::RendererUnavailable(msg) => write!(f, "PDF renderer unavailable: {}", msg),
            AppError::RendererFailure(msg) => write!(f, "PDF generation failed: {}", msg),
            AppError::TransactionFailure(msg) => write!(f, "Transaction failed: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal server error: {}", msg)
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::RendererUnavailable(_) => format!(
                "{}\n\nwkhtmltopdf is required to generate PDFs. Install it from \
                 https://wkhtmltopdf.org/downloads.html (or your package manager) \
                 and set APP_RENDERER_PATH if it is not on the PATH.",
                self
            ),
            AppError::TransactionFailure(detail) => {
                tracing::error!("Submission rolled back: {}", detail);
                "The profile could not be saved. No changes were made.".to_string()
            }
            AppError::InternalError(detail) => {
                tracing::error!("Internal error: {}", detail);
                self.to_string()
            }
            _ => self.to_string(),
        };

        HttpResponse::build(self.status_code())
            .insert_header(ContentType::plaintext())
            .body(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RendererUnavailable(_)
            | AppError::RendererFailure(_)
            | AppError::TransactionFailure(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::ValidationError(field_errors(&errors, ""))
    }
}

/// Flattens `validator` errors into `FieldError`s whose field names carry `prefix`.
pub fn field_errors(errors: &ValidationErrors, prefix: &str) -> Vec<FieldError> {
    errors
        .errors()
        .iter()
        .flat_map(|(field, kind)| {
            let field = format!("{}{}", prefix, field);
            match kind {
                ValidationErrorsKind::Field(errors) => errors
                    .iter()
                    .map(|e| FieldError {
                        field: field.clone(),
                        message: e
                            .message
                            .as_ref()
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| "Invalid value".to_string()),
                    })
                    .collect::<Vec<_>>(),
                _ => vec![FieldError {
                    field,
                    message: "Invalid value".to_string(),
                }],
            }
        })
        .collect()
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Database row not found".into()),
            _ => AppError::InternalError(format!("Database error: {}", err))
        }
    }
}

impl From<tera::Error> for AppError {
    fn from(err: tera::Error) -> Self {
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        AppError::InternalError(format!("Template error: {}", message))
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::NotInstalled => AppError::RendererUnavailable(err.to_string()),
            _ => AppError::RendererFailure(err.to_string()),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(format!("IO error: {}", err))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}
