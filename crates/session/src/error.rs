//! Session Error Types
//!
//! One unified error path for the crate. Collaborator failures arrive
//! in whatever shape the hosted service produces; they are normalized
//! to a human-readable message here and nothing else leaks out.

use thiserror::Error;

/// Session-specific result type alias
pub type SessionResult<T> = Result<T, SessionError>;

/// Fallback shown when the collaborator's error carries no usable message.
const GENERIC_AUTH_MESSAGE: &str = "Authentication failed. Please try again.";

/// Session-specific error variants
#[derive(Debug, Error)]
pub enum SessionError {
    /// The collaborator rejected the request; carries the normalized
    /// human-readable message extracted from its error payload
    #[error("{0}")]
    Rejected(String),

    /// A sign-in/sign-up call is already outstanding
    #[error("A submission is already in progress")]
    SubmissionInProgress,

    /// Operation requires an active session
    #[error("No active session")]
    NotAuthenticated,

    /// Local input validation failed before any store call was made
    #[error("{0}")]
    Validation(String),

    /// Transport or serialization fault talking to the collaborator
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    /// Message suitable for inline display next to the active form.
    ///
    /// Transport faults are presented with the same generic message as
    /// a credential rejection; the controller does not distinguish
    /// error subkinds, only presents text.
    pub fn display_message(&self) -> String {
        match self {
            SessionError::Rejected(message) | SessionError::Validation(message) => message.clone(),
            SessionError::Internal(_) => GENERIC_AUTH_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// Log the error with appropriate level
    pub(crate) fn log(&self) {
        match self {
            SessionError::Internal(msg) => {
                tracing::error!(message = %msg, "Session internal error");
            }
            SessionError::Rejected(msg) => {
                tracing::warn!(message = %msg, "Submission rejected by auth service");
            }
            _ => {
                tracing::debug!(error = %self, "Session error");
            }
        }
    }
}

/// Extract a display message from a collaborator error payload.
///
/// The hosted service is not consistent about its error shape: a plain
/// string, an object with `msg`, `message`, `error_description` or
/// `error`, or something else entirely. Anything unrecognized falls
/// back to a generic message.
pub fn normalize_error_body(body: &serde_json::Value) -> String {
    if let Some(text) = body.as_str() {
        if !text.trim().is_empty() {
            return text.to_string();
        }
    }

    if body.is_object() {
        for key in ["message", "msg", "error_description", "error"] {
            if let Some(text) = body.get(key).and_then(serde_json::Value::as_str) {
                if !text.trim().is_empty() {
                    return text.to_string();
                }
            }
        }
    }

    GENERIC_AUTH_MESSAGE.to_string()
}
