//! The uniform error taxonomy shared by every command/query handler.
//!
//! Spec: handlers translate domain conditions into one of a small set of
//! kinds at the edge of business logic; transport adapters translate kinds
//! into RPC status codes. This module owns that taxonomy so the mapping is
//! defined exactly once.

use thiserror::Error;

/// Result type alias used throughout the bus, handlers, and repositories.
pub type Result<T> = std::result::Result<T, CoreError>;

/// The cross-cutting error kinds every handler, reconciler, and repository
/// reports through.
///
/// # Examples
///
/// ```
/// use composable_rust_core::error::CoreError;
///
/// let err = CoreError::not_found("ShortLink");
/// assert!(matches!(err, CoreError::NotFound(_)));
/// ```
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// A command or query failed validation before dispatch.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A referenced entity does not exist (or is soft-deleted and
    /// `include_deleted` was not requested).
    #[error("{0} not found")]
    NotFound(String),

    /// A uniqueness invariant was violated.
    #[error("{0} already exists")]
    Conflict(String),

    /// The aggregate is not in a state where the requested transition is
    /// legal (e.g. opening an already-opened item, ending an ended stream).
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// The caller is not permitted to perform this command.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// A rate limit (e.g. chat-command cooldown) was hit.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// No handler is registered for this command/query type.
    #[error("no handler registered for {0}")]
    NotRegistered(String),

    /// The request- or worker-scoped context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// An unexpected internal failure. The message is stripped of detail
    /// before crossing a transport boundary; full detail goes to
    /// `tracing::error!` at the point of origin.
    #[error("internal error")]
    Internal(String),
}

impl CoreError {
    /// Build a [`CoreError::NotFound`] for the named entity.
    #[must_use]
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound(entity.into())
    }

    /// Build a [`CoreError::Conflict`] for the named field.
    #[must_use]
    pub fn conflict(field: impl Into<String>) -> Self {
        Self::Conflict(field.into())
    }

    /// Build a [`CoreError::InvalidArgument`] with a message.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Returns `true` for errors that are the caller's fault and must never
    /// be retried server-side (spec §7 recovery policy).
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_) | Self::NotFound(_) | Self::Conflict(_) | Self::NotAuthorized(_)
        )
    }

    /// Returns `true` if the condition may clear on its own and is worth
    /// retrying (used by the chat session's 401-refresh-then-retry-once
    /// policy and the delivery retry loop).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Internal(_) | Self::RateLimited(_))
    }
}
