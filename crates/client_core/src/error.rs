//! Error taxonomy shared by the two service clients, the normalizer, and the
//! workflow controller.

use thiserror::Error;

/// Typed failure carried in [`crate::WorkflowState::Failed`].
///
/// Raw transport errors never leave the clients; they are mapped into one of
/// these variants first so the value can be cloned into published state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    #[error("request timed out")]
    Timeout,
    #[error("service responded with status {status}{}", detail_suffix(.message))]
    ServiceError {
        status: u16,
        message: Option<String>,
    },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("validation failed: {0}")]
    ValidationError(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("another operation is already in flight")]
    Busy,
    #[error("transport failure: {0}")]
    Transport(String),
}

fn detail_suffix(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(": {message}"),
        None => String::new(),
    }
}

impl WorkflowError {
    pub fn service(status: u16) -> Self {
        Self::ServiceError {
            status,
            message: None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ServiceError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a caller-side retry has a reasonable chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) => true,
            Self::ServiceError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// One sentence suitable for showing next to a retry button.
    pub fn user_message(&self) -> String {
        match self {
            Self::Timeout => "The service did not answer in time; please retry.".to_string(),
            Self::ServiceError {
                status,
                message: Some(message),
            } => format!("The service reported an error ({status}): {message}."),
            Self::ServiceError {
                status,
                message: None,
            } => format!("The service reported an error ({status})."),
            Self::MalformedResponse(_) => {
                "The service returned data in an unexpected format.".to_string()
            }
            Self::InvalidInput(detail) => format!("The sensor values cannot be used: {detail}."),
            Self::ValidationError(detail) => {
                format!("The recommendation was rejected: {detail}.")
            }
            Self::InvalidState(detail) => format!("That action is not available yet: {detail}."),
            Self::Busy => "Please wait for the current request to finish.".to_string(),
            Self::Transport(_) => {
                "Service unreachable; check the URL and network, then retry.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for WorkflowError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else if let Some(status) = err.status() {
            Self::service(status.as_u16())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
