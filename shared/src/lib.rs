// shared/src/lib.rs

/// Failure raised by an operation while validating or computing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    ResultTooLarge(String),
    #[error("{0}")]
    Internal(String),
}

impl OperationError {
    pub fn invalid(message: impl Into<String>) -> Self {
        OperationError::InvalidArgument(message.into())
    }

    pub fn too_large(message: impl Into<String>) -> Self {
        OperationError::ResultTooLarge(message.into())
    }

    /// Whether the caller is at fault (bad input), as opposed to the service.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            OperationError::InvalidArgument(_) | OperationError::ResultTooLarge(_)
        )
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unsupported operation: {0}")]
    UnknownOperation(String),
    #[error("operation failed: {0}")]
    OperationFailed(#[from] OperationError),
    #[error("storage: {0}")]
    Storage(String),
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("internal: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod config;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_errors_convert_and_display() {
        let error: Error = OperationError::too_large("Result too large to compute").into();
        assert_eq!(error.to_string(), "operation failed: Result too large to compute");
        assert!(matches!(error, Error::OperationFailed(ref e) if e.is_user_error()));
        assert!(!OperationError::Internal("panicked".into()).is_user_error());
    }
}
