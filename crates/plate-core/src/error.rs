//! Error types for the editor

use thiserror::Error;

/// Input rejected before the document is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Select some text first")]
    EmptySelection,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("File is too large: {size} bytes (limit {limit} bytes)")]
    SizeLimitExceeded { size: u64, limit: u64 },
}

impl EditorError {
    /// Text suitable for showing to the user as-is.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid editor config: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Invalid snapshot: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unknown snapshot schema: {0:?}")]
    Schema(String),

    #[error("Unsupported snapshot version {found} (newest supported is {supported})")]
    Version { found: u32, supported: u32 },
}
