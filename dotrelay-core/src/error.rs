use thiserror::Error;

#[derive(Error, Debug)]
pub enum DotrelayError {
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Missing required parameter '{parameter}' for {operation}")]
    MissingParameter { operation: String, parameter: String },

    #[error("Invalid value for parameter '{parameter}' of {operation}: {reason}")]
    InvalidParameter {
        operation: String,
        parameter: String,
        reason: String,
    },

    #[error("Unknown parameter '{parameter}' for {operation}")]
    UnknownParameter { operation: String, parameter: String },

    #[error("Invalid command line: {0}")]
    InvalidCommandLine(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("Availability probe failed: {0}")]
    ProbeFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl DotrelayError {
    /// True for errors raised while turning a request into an argument vector.
    pub fn is_composition_error(&self) -> bool {
        matches!(
            self,
            DotrelayError::MissingParameter { .. }
                | DotrelayError::InvalidParameter { .. }
                | DotrelayError::UnknownParameter { .. }
                | DotrelayError::InvalidCommandLine(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DotrelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parameter_message() {
        let err = DotrelayError::MissingParameter {
            operation: "ef_migrations_add".to_string(),
            parameter: "name".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing required parameter 'name' for ef_migrations_add"
        );
        assert!(err.is_composition_error());
    }

    #[test]
    fn test_runtime_errors_are_not_composition_errors() {
        assert!(!DotrelayError::UnknownOperation("x".to_string()).is_composition_error());
        assert!(!DotrelayError::ExecutableNotFound("dotnet".to_string()).is_composition_error());
    }
}
