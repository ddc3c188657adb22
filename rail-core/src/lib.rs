pub mod notify;
pub mod repository;
pub mod search;

use rail_shared::{SeatClass, UnknownVariant};

/// Failure taxonomy shared by every booking and catalog operation.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    NotFound(String),
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Not enough {seat_class} seats available. Only {remaining} seats left")]
    CapacityExceeded {
        seat_class: SeatClass,
        remaining: i32,
    },
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl CoreError {
    pub fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        CoreError::NotFound(format!("{kind} not found with id of {id}"))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::ValidationError(msg.into())
    }
}

impl From<repository::RepoError> for CoreError {
    fn from(err: repository::RepoError) -> Self {
        CoreError::Storage(err.to_string())
    }
}

impl From<UnknownVariant> for CoreError {
    fn from(err: UnknownVariant) -> Self {
        CoreError::ValidationError(err.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
