use super::types::GateError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
}

impl GateError {
    /// Classify this error to determine its type and whether it can be retried.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            // Transient transport failures
            GateError::Network(_) => ErrorClassification {
                error_type: "NetworkError",
                retryable: true,
            },
            GateError::Io(_) => ErrorClassification {
                error_type: "IoError",
                retryable: true,
            },

            // Terminal errors
            GateError::Config(_) => ErrorClassification {
                error_type: "ConfigurationError",
                retryable: false,
            },
            GateError::Authentication(_) => ErrorClassification {
                error_type: "AuthenticationError",
                retryable: false,
            },
            GateError::Backend(_) => ErrorClassification {
                error_type: "BackendCallError",
                retryable: false,
            },
            GateError::Processing(_) => ErrorClassification {
                error_type: "ProcessingError",
                retryable: false,
            },
            GateError::Timeout(_) => ErrorClassification {
                error_type: "TimeoutError",
                retryable: false,
            },
            GateError::NotFound(_) => ErrorClassification {
                error_type: "NotFoundError",
                retryable: false,
            },
            GateError::Cancelled(_) => ErrorClassification {
                error_type: "CancelledError",
                retryable: false,
            },
            GateError::InvalidInput(_) => ErrorClassification {
                error_type: "InvalidInputError",
                retryable: false,
            },
            GateError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                retryable: false,
            },
            GateError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                retryable: false,
            },
            GateError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                retryable: false,
            },
        }
    }

    /// A timeout leaves the build "not completed" instead of failed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, GateError::Timeout(_))
    }
}
