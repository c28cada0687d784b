use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubpairError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SubpairError {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        SubpairError::NotFound(path.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        SubpairError::Config(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SubpairError>;
