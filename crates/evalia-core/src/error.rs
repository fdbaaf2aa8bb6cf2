//! Core error type shared across the workspace.

use thiserror::Error;

/// Errors raised by core facilities (configuration, filesystem).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
