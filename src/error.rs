use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Task ID already exists: {0}")]
    DuplicateTask(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Master returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
