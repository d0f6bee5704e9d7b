use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum NotesError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Note not found: {0}")]
    NotFound(Uuid),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl From<uuid::Error> for NotesError {
    fn from(err: uuid::Error) -> Self {
        NotesError::InvalidOperation(err.to_string())
    }
}
