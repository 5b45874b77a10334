//! Unified error types for the folder vault client.

use std::fmt;

/// Application-specific errors.
///
/// Cloneable so that a single in-flight fetch can hand its outcome to every
/// reader waiting on it.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Stored credential could not be decoded into an identity
    Decode(String),
    /// Backend response did not have the expected structure
    Shape(String),
    /// Network or HTTP failure reported by the transport
    Transport {
        status: Option<u16>,
        message: String,
    },
    /// Local input rejected before any request was issued
    Validation(ValidationError),
    /// Credential storage could not be read or written
    Storage(String),
}

/// Locally detectable input errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyFolderName,
    FolderNameTooLong { max: usize, actual: usize },
    InvalidFolderNameCharacters,
    EmptyImageName,
    MissingImageData,
    ImageTooLarge { max_bytes: usize, actual: usize },
    UnsupportedImageType,
    FolderRequired,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyFolderName => write!(f, "Folder name is required"),
            ValidationError::FolderNameTooLong { max, actual } => write!(
                f,
                "Folder name must be at most {} characters (got {})",
                max, actual
            ),
            ValidationError::InvalidFolderNameCharacters => {
                write!(f, "Folder name contains invalid characters")
            }
            ValidationError::EmptyImageName => write!(f, "Image name is required"),
            ValidationError::MissingImageData => write!(f, "Image is required"),
            ValidationError::ImageTooLarge { max_bytes, actual } => write!(
                f,
                "Image is {} bytes, the limit is {} bytes",
                actual, max_bytes
            ),
            ValidationError::UnsupportedImageType => write!(f, "Unsupported image type"),
            ValidationError::FolderRequired => write!(f, "Please select a folder first"),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Decode(msg) => write!(f, "Credential decode error: {}", msg),
            AppError::Shape(msg) => write!(f, "Unexpected response shape: {}", msg),
            AppError::Transport {
                status: Some(status),
                message,
            } => write!(f, "Request failed ({}): {}", status, message),
            AppError::Transport {
                status: None,
                message,
            } => write!(f, "Request failed: {}", message),
            AppError::Validation(err) => write!(f, "Invalid input: {}", err),
            AppError::Storage(msg) => write!(f, "Credential storage error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Shape(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl AppError {
    /// Returns true for errors raised before any request left the client.
    pub fn is_local(&self) -> bool {
        matches!(self, AppError::Validation(_) | AppError::Decode(_))
    }
}

/// Type alias for Results in this crate.
pub type Result<T> = std::result::Result<T, AppError>;
