//! Request- and worker-scoped context threaded through every handler,
//! reconciler tick, and repository call.

use tokio_util::sync::CancellationToken;

/// Context carried on every command/query dispatch and every reconciler
/// tick.
///
/// Spec §5: "every handler and every reconciler accepts a request- or
/// worker-scoped context; on cancellation they must return promptly with a
/// cancellation error." Spec §1 non-goals: the platform consumes an
/// identity from request metadata but never mints one, so `principal` is
/// opaque and optional.
#[derive(Clone, Debug)]
pub struct RequestContext {
    /// Cooperative cancellation signal. Checked at the top of handlers and
    /// between iterations of reconciler sweeps.
    pub cancellation: CancellationToken,

    /// Opaque identity taken from request metadata, if any. `None` for
    /// background reconciler ticks which act as the system itself.
    pub principal: Option<String>,

    /// Correlates log lines for a single request/tick across crates.
    pub trace_id: String,
}

impl RequestContext {
    /// Build a new root context with a fresh trace id.
    #[must_use]
    pub fn new(principal: Option<String>) -> Self {
        Self {
            cancellation: CancellationToken::new(),
            principal,
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Build a context for background (reconciler) work, scoped to a
    /// shared shutdown token so the driver loop can cancel every
    /// in-flight tick at once.
    #[must_use]
    pub fn for_worker(shutdown: &CancellationToken) -> Self {
        Self {
            cancellation: shutdown.child_token(),
            principal: None,
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Returns the [`CoreError::Cancelled`](crate::error::CoreError::Cancelled)
    /// if this context has been cancelled, otherwise `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Cancelled` once `self.cancellation` has fired.
    pub fn check_cancelled(&self) -> crate::error::Result<()> {
        if self.cancellation.is_cancelled() {
            Err(crate::error::CoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_not_cancelled() {
        let ctx = RequestContext::new(Some("user-1".to_string()));
        assert!(ctx.check_cancelled().is_ok());
    }

    #[test]
    fn cancelled_context_reports_cancelled_error() {
        let ctx = RequestContext::new(None);
        ctx.cancellation.cancel();
        assert!(matches!(
            ctx.check_cancelled(),
            Err(crate::error::CoreError::Cancelled)
        ));
    }

    #[test]
    fn worker_context_inherits_parent_cancellation() {
        let shutdown = CancellationToken::new();
        let ctx = RequestContext::for_worker(&shutdown);
        assert!(ctx.check_cancelled().is_ok());
        shutdown.cancel();
        assert!(ctx.check_cancelled().is_err());
    }
}
