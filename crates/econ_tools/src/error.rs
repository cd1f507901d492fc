//! Error type for the development tools.

use econ_core::error::EconomyError;
use thiserror::Error;

/// Error type for tool operations.
#[derive(Error, Debug)]
pub enum ToolError {
    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Content or config was rejected by the economy core.
    #[error(transparent)]
    Economy(#[from] EconomyError),
}
