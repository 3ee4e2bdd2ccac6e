use thiserror::Error;

/// Result alias used across the moderation services.
pub type ModResult<T> = Result<T, ModerationError>;

/// Error taxonomy shared by every moderation operation.
///
/// Each variant maps to a stable machine-readable code and an HTTP status
/// hint, so an embedding transport can translate errors without matching on
/// message text. Messages on `Internal` and `ExternalDependency` are meant
/// for logs and must not be shown to end users verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModerationError {
    /// Malformed or out-of-range input.
    #[error("{0}")]
    Validation(String),

    /// The referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The entity is not in the state the operation requires.
    #[error("{0}")]
    Conflict(String),

    /// The caller lacks the role or ownership the operation requires.
    #[error("{0}")]
    Forbidden(String),

    /// An external collaborator (content service, notifier) failed.
    #[error("external dependency failed: {0}")]
    ExternalDependency(String),

    /// Storage or invariant failure. Details stay in logs.
    #[error("internal error")]
    Internal(String),
}

impl ModerationError {
    /// Stable machine-readable code, independent of message wording.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Forbidden(_) => "forbidden",
            Self::ExternalDependency(_) => "external_dependency",
            Self::Internal(_) => "internal_error",
        }
    }

    /// HTTP status hint for embedding transports.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Forbidden(_) => 403,
            Self::ExternalDependency(_) => 502,
            Self::Internal(_) => 500,
        }
    }

    /// Wraps a storage-layer failure. The cause is kept for logging only.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }
}
