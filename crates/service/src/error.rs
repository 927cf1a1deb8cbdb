#![forbid(unsafe_code)]

use cm_storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Missing or malformed input, detected before any store call.
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("persistence failed: {0}")]
    Persistence(StoreError),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Persistence(_) => "PERSISTENCE",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Classifies a store failure for an operation on `kind`/`id`.
    pub fn from_store(err: StoreError, kind: &'static str, id: &str) -> Self {
        match err {
            StoreError::UnknownId => Self::not_found(kind, id),
            StoreError::InvalidInput(message) if !message.starts_with("RESET_REQUIRED") => {
                Self::Validation(message.to_string())
            }
            StoreError::AlreadyExists => Self::Validation(format!("{kind} {id} already exists")),
            other => Self::Persistence(other),
        }
    }
}
