//! Error types shared by the sizing crates.
//!
//! Input validation and file handling report through [`HbessError`]. The
//! optimizer has its own richer error in `hbess-algo`, which wraps this one.

use thiserror::Error;

/// Error type for cell, load-profile, and configuration handling.
#[derive(Error, Debug)]
pub enum HbessError {
    /// I/O errors (missing files, permissions)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Inputs that violate a precondition (non-positive capacity, unsorted timestamps)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using HbessError.
pub type HbessResult<T> = Result<T, HbessError>;

impl HbessError {
    pub fn validation(msg: impl Into<String>) -> Self {
        HbessError::Validation(msg.into())
    }
}

impl From<anyhow::Error> for HbessError {
    fn from(err: anyhow::Error) -> Self {
        HbessError::Other(err.to_string())
    }
}

impl From<String> for HbessError {
    fn from(s: String) -> Self {
        HbessError::Other(s)
    }
}

impl From<&str> for HbessError {
    fn from(s: &str) -> Self {
        HbessError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for HbessError {
    fn from(err: serde_json::Error) -> Self {
        HbessError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HbessError::validation("rated capacity must be positive");
        assert!(err.to_string().contains("Validation error"));
        assert!(err.to_string().contains("rated capacity"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "profile.csv");
        let err: HbessError = io_err.into();
        assert!(matches!(err, HbessError::Io(_)));
    }

    #[test]
    fn test_json_error_is_parse() {
        let err: HbessError = serde_json::from_str::<f64>("not a number")
            .unwrap_err()
            .into();
        assert!(matches!(err, HbessError::Parse(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> HbessResult<()> {
            Err("boom".into())
        }

        fn outer() -> HbessResult<()> {
            inner()?;
            Ok(())
        }

        assert!(matches!(outer(), Err(HbessError::Other(_))));
    }
}
