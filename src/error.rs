//! Error types for the task repository and its storage.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Task not found: {id}")]
    NotFound { id: String },

    #[error("Task id already exists: {id}")]
    DuplicateId { id: String },

    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("Project name must not be empty")]
    EmptyProjectName,

    #[error("Project already exists: {name}")]
    DuplicateProject { name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// HTTP status the API answers with for this error.
    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::DuplicateId { .. } | Self::DuplicateProject { .. } => 409,
            Self::EmptyTitle | Self::EmptyProjectName | Self::Json(_) => 400,
            Self::Io(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
