//! Error types for dayplan
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown ids, bad config)
//! - 3: Rejected (duplicate titles, failed login, bad verification token)
//! - 4: Operation failed (I/O, serialization, lock contention)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the dayplan CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const REJECTED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for dayplan operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Topic not found: {0}")]
    TopicNotFound(String),

    #[error("Topic task not found: {topic_id}/{task_id}")]
    TopicTaskNotFound { topic_id: String, task_id: String },

    // Rejections (exit code 3)
    #[error("Duplicate task title in topic {topic_id}: {title}")]
    DuplicateTitle { topic_id: String, title: String },

    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    #[error("Email already registered: {0}")]
    EmailTaken(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email not verified: {0}")]
    NotVerified(String),

    #[error("Invalid or expired verification token")]
    InvalidToken,

    #[error("Not logged in")]
    NotAuthenticated,

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::TaskNotFound(_)
            | Error::TopicNotFound(_)
            | Error::TopicTaskNotFound { .. } => exit_codes::USER_ERROR,

            // Rejections
            Error::DuplicateTitle { .. }
            | Error::DuplicateId(_)
            | Error::EmailTaken(_)
            | Error::InvalidCredentials
            | Error::NotVerified(_)
            | Error::InvalidToken
            | Error::NotAuthenticated => exit_codes::REJECTED,

            // Operation failures
            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured fields for JSON error output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::InvalidConfig(message)
            | Error::InvalidArgument(message)
            | Error::OperationFailed(message) => {
                Some(serde_json::json!({ "message": message }))
            }
            Error::TaskNotFound(id) | Error::TopicNotFound(id) | Error::DuplicateId(id) => {
                Some(serde_json::json!({ "id": id }))
            }
            Error::TopicTaskNotFound { topic_id, task_id } => Some(serde_json::json!({
                "topic_id": topic_id,
                "task_id": task_id,
            })),
            Error::DuplicateTitle { topic_id, title } => Some(serde_json::json!({
                "topic_id": topic_id,
                "title": title,
            })),
            Error::EmailTaken(email) | Error::NotVerified(email) => {
                Some(serde_json::json!({ "email": email }))
            }
            Error::LockFailed(path) => {
                Some(serde_json::json!({ "path": path.to_string_lossy() }))
            }
            _ => None,
        }
    }
}

/// Result type alias for dayplan operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
