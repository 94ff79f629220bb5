//! Application error type shared by the library layers.
//!
//! Binaries wrap these in [`anyhow`] at the edges; everything below `main`
//! returns [`AppError`] so callers can match on the failure kind.

use serde_json::{Value, json};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { message: String, details: Value },
    #[error("{message}")]
    NotFound { message: String, details: Value },
    #[error("{message}")]
    Database { message: String, details: Value },
    #[error("{message}")]
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }
    pub fn database(message: impl Into<String>, details: Value) -> Self {
        Self::Database {
            message: message.into(),
            details,
        }
    }
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    /// Stable machine-readable code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "validation_error",
            AppError::NotFound { .. } => "not_found",
            AppError::Database { .. } => "database_error",
            AppError::Internal { .. } => "internal_error",
        }
    }

    pub fn details(&self) -> &Value {
        match self {
            AppError::Validation { details, .. }
            | AppError::NotFound { details, .. }
            | AppError::Database { details, .. }
            | AppError::Internal { details, .. } => details,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        map_sqlx_error(e)
    }
}

pub fn map_sqlx_error(e: sqlx::Error) -> AppError {
    if let Some(db) = e.as_database_error() {
        return AppError::database(
            "Database error",
            json!({
                "code": db.code().map(|c| c.into_owned()),
                "constraint": db.constraint(),
                "message": db.message(),
            }),
        );
    }

    match e {
        sqlx::Error::RowNotFound => AppError::not_found("Row not found", json!({})),
        sqlx::Error::PoolTimedOut => {
            AppError::database("Timed out acquiring a connection", json!({}))
        }
        other => AppError::database("Database error", json!({ "reason": other.to_string() })),
    }
}
