use std::time::Duration;

use serde::Serialize;
use utoipa::ToSchema;

/// Structured error response returned by the HTTP service.
/// Every error carries enough information for a client to see what was
/// rejected and how to correct it.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    /// Machine-readable error code (e.g. "validation_failed", "not_found")
    pub error: String,
    /// Human-readable description of what went wrong
    pub message: String,
    /// Which field caused the error (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// The value that was received (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<serde_json::Value>,
    /// Request ID for tracing and debugging
    pub request_id: String,
    /// Hint about what the correct usage looks like
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

/// Error codes used across the API
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const NOT_FOUND: &str = "not_found";
    pub const UPSTREAM_FAILED: &str = "upstream_failed";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// A Sample that cannot enter a scoring cycle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub received: Option<serde_json::Value>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            received: None,
        }
    }

    pub fn with_received(mut self, received: serde_json::Value) -> Self {
        self.received = Some(received);
        self
    }
}

/// Failure to read or append persisted history.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("history backend failed: {0}")]
    Backend(String),
    #[error("history partition lock poisoned for entity {0:?}")]
    Poisoned(Option<String>),
    #[error("seed snapshot rejected: {0}")]
    Seed(String),
}

/// Failure of the external base estimator.
#[derive(Debug, thiserror::Error)]
pub enum EstimatorError {
    #[error("estimator unavailable: {0}")]
    Unavailable(String),
    #[error("estimator timed out after {0:?}")]
    Timeout(Duration),
    #[error("estimator rejected the features: {0}")]
    Rejected(String),
    #[error("estimator returned an invalid score: {0}")]
    InvalidOutput(String),
}

/// Failure of the external reasoning call. Never leaves the contextual
/// adjuster; every variant routes the cycle to the fallback classifier.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReasoningError {
    #[error("reasoning service not configured")]
    NotConfigured,
    #[error("reasoning transport failed: {0}")]
    Transport(String),
    #[error("reasoning call timed out after {0:?}")]
    Timeout(Duration),
    #[error("reasoning response is not a JSON object: {0}")]
    Malformed(String),
    #[error("reasoning response field `{field}` invalid: {message}")]
    Schema { field: String, message: String },
}

impl ReasoningError {
    /// Short failure class used in logs.
    pub fn class(&self) -> &'static str {
        match self {
            ReasoningError::NotConfigured => "not_configured",
            ReasoningError::Transport(_) => "transport",
            ReasoningError::Timeout(_) => "timeout",
            ReasoningError::Malformed(_) => "malformed",
            ReasoningError::Schema { .. } => "schema",
        }
    }
}

/// Why a scoring cycle produced no Assessment.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Estimator(#[from] EstimatorError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
