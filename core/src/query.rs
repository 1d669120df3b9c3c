//! The `Query` contract (spec §4.2).
//!
//! Identical registration/dispatch shape to [`crate::command`], except
//! handlers return a value rather than mutating state, and must be
//! side-effect free.

use crate::context::RequestContext;
use crate::error::{CoreError, Result};
use std::any::Any;
use std::future::Future;
use std::pin::Pin;

/// A typed, side-effect-free request dispatched through the
/// [`crate::bus::QueryBus`].
pub trait Query: Any + Send + Sync {
    /// The value this query resolves to.
    type Output: Send + 'static;

    /// Stable name for this query, e.g. `"GetLinkStats"`.
    fn query_name(&self) -> &'static str;
}

/// Handler for a single concrete query type.
pub trait QueryHandler<Q: Query>: Send + Sync {
    /// Resolve the query's output. Must not mutate any aggregate.
    ///
    /// # Errors
    ///
    /// Returns any [`CoreError`] the read-side composition produces.
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        query: &'a Q,
    ) -> Pin<Box<dyn Future<Output = Result<Q::Output>> + Send + 'a>>;
}

/// Type-erased query handler stored inside [`crate::bus::QueryBus`].
///
/// The concrete output type varies per query, so the erased form boxes its
/// result as `Box<dyn Any + Send>`; [`crate::bus::QueryBus::dispatch`]
/// downcasts it back to `Q::Output` immediately after the call, so callers
/// never observe the erasure.
pub(crate) trait ErasedQueryHandler: Send + Sync {
    fn handle_erased<'a>(
        &'a self,
        ctx: &'a RequestContext,
        query: &'a dyn Any,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn Any + Send>>> + Send + 'a>>;
}

pub(crate) struct TypedQueryHandler<Q, H> {
    pub(crate) handler: H,
    _marker: std::marker::PhantomData<Q>,
}

impl<Q, H> TypedQueryHandler<Q, H> {
    pub(crate) const fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<Q, H> ErasedQueryHandler for TypedQueryHandler<Q, H>
where
    Q: Query + 'static,
    H: QueryHandler<Q>,
{
    fn handle_erased<'a>(
        &'a self,
        ctx: &'a RequestContext,
        query: &'a dyn Any,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn Any + Send>>> + Send + 'a>> {
        Box::pin(async move {
            let query = query.downcast_ref::<Q>().ok_or_else(|| {
                CoreError::Internal("query type mismatch in bus registry".to_string())
            })?;
            let output = self.handler.handle(ctx, query).await?;
            Ok(Box::new(output) as Box<dyn Any + Send>)
        })
    }
}
