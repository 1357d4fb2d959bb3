//! Error types for position aggregation.

use thiserror::Error;

/// Errors raised while building the positions view.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The mock positions file could not be read or is missing a field.
    #[error("malformed mock data at {path}: {reason}")]
    MockData {
        /// Location inside the document (or the file path for I/O errors).
        path: String,
        /// What was wrong.
        reason: String,
    },
}

impl CoreError {
    /// Creates a mock data error.
    pub fn mock_data(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MockData {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a missing-field error for a mock data location.
    pub fn missing_field(path: impl Into<String>) -> Self {
        Self::mock_data(path, "missing or wrong type")
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_data_display() {
        let err = CoreError::missing_field("payload.data[0].trades");
        let display = err.to_string();
        assert!(display.contains("payload.data[0].trades"));
        assert!(display.contains("missing"));
    }

    #[test]
    fn test_io_style_error_keeps_reason() {
        let err = CoreError::mock_data("data/mock.json", "No such file or directory");
        assert!(err.to_string().contains("No such file"));
    }
}
