// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Referenced record does not exist (e.g. deleting an unknown missionary)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness violation reported by a repository (e.g. attendance already recorded)
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for failures that are not attributable to the repository itself
    pub fn is_system(&self) -> bool {
        matches!(self, AppError::Internal(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by mapping to AppError::Database / AppError::Conflict / AppError::NotFound
