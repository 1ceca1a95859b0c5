//! Typed failures surfaced by the stack client.
//!
//! Remote errors are passed through verbatim; the kind only classifies the
//! service's own error code so callers and tests can match on it without
//! parsing message text.
use thiserror::Error;

/// Failure classes the provisioning service reports, plus local transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Create refused: a stack with that name already exists in the region.
    AlreadyExists,
    /// Update or delete refused: no stack with that name in the region.
    NotFound,
    /// Update refused: the submitted template and parameters match the
    /// deployed stack.
    NoChanges,
    /// Update refused: another update on the same stack holds the remote lock.
    UpdateInProgress,
    /// The template declares privileged resources the request did not
    /// acknowledge.
    InsufficientCapabilities,
    /// The service rejected the template during schema validation.
    MalformedTemplate,
    /// Any other error the service returned.
    Remote,
    /// The request never reached the service or the response was unreadable.
    Transport,
}

impl ApiErrorKind {
    /// Map the service's error code onto a kind; unknown codes stay `Remote`.
    pub fn from_code(code: &str) -> ApiErrorKind {
        match code {
            "AlreadyExists" => ApiErrorKind::AlreadyExists,
            "NotFound" => ApiErrorKind::NotFound,
            "NoChanges" => ApiErrorKind::NoChanges,
            "UpdateInProgress" => ApiErrorKind::UpdateInProgress,
            "InsufficientCapabilities" => ApiErrorKind::InsufficientCapabilities,
            "MalformedTemplate" => ApiErrorKind::MalformedTemplate,
            _ => ApiErrorKind::Remote,
        }
    }
}

/// A terminal failure from one remote call. Never retried.
#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> ApiError {
        ApiError {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> ApiError {
        ApiError::new(ApiErrorKind::Transport, message)
    }
}
