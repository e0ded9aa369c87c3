//! Error types for badger operations.
//!
//! Provides a structured error hierarchy with error codes for programmatic
//! handling. Transient failures from external collaborators (inference,
//! notification) are usually caught at the call site and degraded to a safe
//! default; the variants here cover everything that still propagates.

use thiserror::Error;

/// Result type alias for badger operations.
pub type BadgerResult<T> = Result<T, BadgerError>;

/// Main error type for all badger operations.
#[derive(Error, Debug)]
pub enum BadgerError {
    /// Text inference call failed.
    #[error("Inference error: {message}")]
    Inference {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Notification delivery failed.
    #[error("Notification error: {message}")]
    Notification {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Entity not found.
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        entity_id: Option<String>,
    },

    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation { message: String, code: ErrorCode },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Parse error.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Inference (INFER_xxx)
    InferConnectionFailed,
    InferGenerationFailed,
    InferInvalidResponse,

    // Notification (NOTIFY_xxx)
    NotifyDeliveryFailed,
    NotifyRejected,

    // Database (DB_xxx)
    DbConnectionFailed,
    DbOperationFailed,
    DbConstraintViolated,

    // Entities (ENT_xxx)
    EntWorkItemNotFound,
    EntMentionNotFound,

    // Validation (VAL_xxx)
    ValInvalidInput,
    ValMissingField,

    // Parse (PARSE_xxx)
    ParseInvalidJson,
    ParseInvalidTimestamp,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InferConnectionFailed => "INFER_001",
            ErrorCode::InferGenerationFailed => "INFER_002",
            ErrorCode::InferInvalidResponse => "INFER_003",
            ErrorCode::NotifyDeliveryFailed => "NOTIFY_001",
            ErrorCode::NotifyRejected => "NOTIFY_002",
            ErrorCode::DbConnectionFailed => "DB_001",
            ErrorCode::DbOperationFailed => "DB_002",
            ErrorCode::DbConstraintViolated => "DB_003",
            ErrorCode::EntWorkItemNotFound => "ENT_001",
            ErrorCode::EntMentionNotFound => "ENT_002",
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValMissingField => "VAL_002",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::ParseInvalidTimestamp => "PARSE_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl BadgerError {
    /// Create an inference error.
    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference {
            message: message.into(),
            code: ErrorCode::InferGenerationFailed,
            source: None,
        }
    }

    /// Create an inference error for a malformed response.
    pub fn inference_response(message: impl Into<String>) -> Self {
        Self::Inference {
            message: message.into(),
            code: ErrorCode::InferInvalidResponse,
            source: None,
        }
    }

    /// Create a notification error.
    pub fn notification(message: impl Into<String>) -> Self {
        Self::Notification {
            message: message.into(),
            code: ErrorCode::NotifyDeliveryFailed,
            source: None,
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Create a not-found error for a work item.
    pub fn work_item_not_found(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::NotFound {
            message: format!("Work item '{}' not found", id),
            code: ErrorCode::EntWorkItemNotFound,
            entity_id: Some(id),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidJson,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Inference { code, .. } => *code,
            Self::Notification { code, .. } => *code,
            Self::Database { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Inference { .. } => Some("Please check your inference provider configuration"),
            Self::Notification { .. } => Some("Please check your chat platform credentials"),
            Self::Database { .. } => Some("Please check the database path and permissions"),
            Self::NotFound { .. } => Some("Please check the id and ensure the record exists"),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for BadgerError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_error() {
        let err = BadgerError::inference("model unavailable");
        assert_eq!(err.code(), ErrorCode::InferGenerationFailed);
        assert!(err.to_string().contains("model unavailable"));
    }

    #[test]
    fn test_work_item_not_found() {
        let err = BadgerError::work_item_not_found("task-123");
        assert_eq!(err.code(), ErrorCode::EntWorkItemNotFound);
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::InferConnectionFailed.as_str(), "INFER_001");
        assert_eq!(ErrorCode::DbConstraintViolated.as_str(), "DB_003");
    }
}
