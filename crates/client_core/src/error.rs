//! Error taxonomy for the submission lifecycle.

use thiserror::Error;

/// User-facing failure carried by a failed submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorReason {
    #[error("no image selected")]
    NoImageSelected,
    #[error("detection service unreachable")]
    NetworkFailure,
    #[error("server error: {0}")]
    ServerError(String),
}

/// Low-level failure of a single call to the detection service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("{}", status_line(.status, .message))]
    Status { status: u16, message: Option<String> },
    #[error("malformed response body: {0}")]
    Malformed(String),
}

fn status_line(status: &u16, message: &Option<String>) -> String {
    match message {
        Some(message) => format!("HTTP {status}: {message}"),
        None => format!("HTTP {status}"),
    }
}

impl From<ServiceError> for ErrorReason {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::Transport(_) => ErrorReason::NetworkFailure,
            other => ErrorReason::ServerError(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("image could not be decoded for preview: {0}")]
    Decode(String),
    #[error("image is empty")]
    Empty,
}
