//! Error types for the EL BARAA portal
//!
//! All errors use thiserror for structured error handling.
//! These errors serialize to their display string so views can show them inline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway returned {status}: {message}")]
    Gateway { status: u16, message: String },

    #[error("{0}")]
    Validation(String),

    #[error("Navigation error: {0}")]
    Navigation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("The resource already exists: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// True for errors raised locally before any gateway call was made
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
