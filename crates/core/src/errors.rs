use thiserror::Error;

use crate::approvals::SelectionError;
use crate::calculator::CalculationError;
use crate::domain::approver::Role;
use crate::flows::TransitionKind;
use crate::store::StoreError;

/// Everything a workflow operation can fail with. Any of these aborts the
/// surrounding transaction, so none of them leaves a partial write behind.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("validation failed: {message}")]
    Validation { message: String, fields: Vec<String> },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("role `{role}` may not perform `{transition}`")]
    Forbidden { role: Role, transition: TransitionKind },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("workflow transaction timed out after {timeout_secs}s and was rolled back")]
    Timeout { timeout_secs: u64 },
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>, fields: Vec<String>) -> Self {
        Self::Validation { message: message.into(), fields }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Timeout { .. })
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Forbidden { .. } => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::Persistence(_) => "persistence",
            Self::Timeout { .. } => "timeout",
        }
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let code = self.code();
        let message = self.to_string();
        match self {
            Self::Validation { .. } => InterfaceError::BadRequest { code, message, correlation_id },
            Self::NotFound(_) => InterfaceError::NotFound { code, message, correlation_id },
            Self::Forbidden { .. } => InterfaceError::Forbidden { code, message, correlation_id },
            Self::Conflict(_) => InterfaceError::Conflict { code, message, correlation_id },
            Self::Persistence(_) | Self::Timeout { .. } => {
                InterfaceError::ServiceUnavailable { code, message, correlation_id }
            }
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(value: StoreError) -> Self {
        Self::Persistence(value.to_string())
    }
}

impl From<CalculationError> for WorkflowError {
    fn from(value: CalculationError) -> Self {
        match value {
            CalculationError::Overflow(_) => Self::validation(value.to_string(), Vec::new()),
            other => {
                let fields = other.invalid_fields();
                Self::validation(other.to_string(), fields)
            }
        }
    }
}

impl From<SelectionError> for WorkflowError {
    fn from(value: SelectionError) -> Self {
        match value {
            SelectionError::Store(error) => Self::from(error),
            other => Self::NotFound(other.to_string()),
        }
    }
}

/// Error shape handed to whatever outer surface invokes the workflow.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { code: &'static str, message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { code: &'static str, message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { code: &'static str, message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { code: &'static str, message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { code: &'static str, message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "The requested record or approver could not be found.",
            Self::Forbidden { .. } => "You are not permitted to perform this action.",
            Self::Conflict { .. } => "The application is not in a state that allows this action.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest { code, .. }
            | Self::NotFound { code, .. }
            | Self::Forbidden { code, .. }
            | Self::Conflict { code, .. }
            | Self::ServiceUnavailable { code, .. } => code,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. } => correlation_id,
        }
    }
}
