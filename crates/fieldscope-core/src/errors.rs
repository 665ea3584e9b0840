//! Error types for the fieldscope core library.

/// Top-level error enum for the fieldscope core library.
///
/// Per-file failures (unreadable or unparsable sources) are recovered inside
/// an extraction call and never surface here; what does surface is bad
/// configuration and failures of the surrounding plumbing.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExtractError {
    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        ExtractError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(feature = "python")]
impl From<ExtractError> for pyo3::PyErr {
    fn from(err: ExtractError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyIOError, PyValueError};
        match &err {
            ExtractError::Io(_) => PyIOError::new_err(err.to_string()),
            ExtractError::Parse { .. } => PyValueError::new_err(err.to_string()),
            ExtractError::Config(_) => PyValueError::new_err(err.to_string()),
            ExtractError::Json(_) => PyValueError::new_err(err.to_string()),
        }
    }
}

pub type ExtractResult<T> = Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message() {
        let err = ExtractError::parse("src/A.java", "unexpected token");
        assert_eq!(err.to_string(), "Parse error in src/A.java: unexpected token");
    }

    #[test]
    fn test_io_error_from() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ExtractError = io.into();
        assert!(matches!(err, ExtractError::Io(_)));
    }
}
