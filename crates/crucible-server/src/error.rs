//! Boundary error codes reported to session clients

use crucible_engine::EngineFailure;
use thiserror::Error;

/// Every way a search request can end in an error frame.
///
/// The display form is the stable code; diagnostics go to the log instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("ElementNotFound")]
    ElementNotFound,
    #[error("InvalidMode")]
    InvalidMode,
    #[error("InvalidResultPolicy")]
    InvalidResultPolicy,
    #[error("InvalidRequest")]
    InvalidRequest,
    #[error("SessionBusy")]
    SessionBusy,
    #[error("Timeout")]
    Timeout,
    #[error("TargetUnreachable")]
    TargetUnreachable,
    #[error("Cancelled")]
    Cancelled,
    #[error("EngineInternalError")]
    EngineInternalError,
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::ElementNotFound => "ElementNotFound",
            SessionError::InvalidMode => "InvalidMode",
            SessionError::InvalidResultPolicy => "InvalidResultPolicy",
            SessionError::InvalidRequest => "InvalidRequest",
            SessionError::SessionBusy => "SessionBusy",
            SessionError::Timeout => "Timeout",
            SessionError::TargetUnreachable => "TargetUnreachable",
            SessionError::Cancelled => "Cancelled",
            SessionError::EngineInternalError => "EngineInternalError",
        }
    }

    /// Errors raised while validating a request, before any search starts.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            SessionError::ElementNotFound
                | SessionError::InvalidMode
                | SessionError::InvalidResultPolicy
                | SessionError::InvalidRequest
        )
    }
}

impl From<EngineFailure> for SessionError {
    fn from(failure: EngineFailure) -> Self {
        match failure {
            EngineFailure::Unreachable => SessionError::TargetUnreachable,
            EngineFailure::Cancelled => SessionError::Cancelled,
            EngineFailure::Internal { .. } => SessionError::EngineInternalError,
        }
    }
}
