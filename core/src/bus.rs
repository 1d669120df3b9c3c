//! Command Bus and Query Bus (spec §4.1, §4.2).
//!
//! Both buses are type-keyed registries: exactly one handler per concrete
//! Rust type, looked up by [`TypeId`] rather than the string name returned
//! by [`Command::command_name`]/[`Query::query_name`] (those names exist
//! for logging and metrics labels, not for routing).

use crate::command::{Command, CommandHandler, ErasedCommandHandler, TypedCommandHandler};
use crate::context::RequestContext;
use crate::error::{CoreError, Result};
use crate::query::{ErasedQueryHandler, Query, QueryHandler, TypedQueryHandler};
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Dispatches commands to their single registered handler.
///
/// # Example
///
/// ```
/// use composable_rust_core::bus::CommandBus;
/// use composable_rust_core::command::{Command, CommandHandler};
/// use composable_rust_core::context::RequestContext;
/// use composable_rust_core::error::Result;
/// use std::future::Future;
/// use std::pin::Pin;
///
/// struct Ping { pub pong: Option<String> }
/// impl Command for Ping {
///     fn command_name(&self) -> &'static str { "Ping" }
///     fn validate(&self) -> Result<()> { Ok(()) }
/// }
///
/// struct PingHandler;
/// impl CommandHandler<Ping> for PingHandler {
///     fn handle<'a>(&'a self, _ctx: &'a RequestContext, cmd: &'a mut Ping)
///         -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>
///     {
///         Box::pin(async move {
///             cmd.pong = Some("pong".to_string());
///             Ok(())
///         })
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let mut bus = CommandBus::new();
/// bus.register(PingHandler);
///
/// let ctx = RequestContext::new(None);
/// let mut cmd = Ping { pong: None };
/// bus.dispatch(&ctx, &mut cmd).await.unwrap();
/// assert_eq!(cmd.pong.as_deref(), Some("pong"));
/// # });
/// ```
#[derive(Default)]
pub struct CommandBus {
    handlers: HashMap<TypeId, Box<dyn ErasedCommandHandler>>,
}

impl CommandBus {
    /// Create an empty command bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register the single handler for command type `C`.
    ///
    /// Registering a second handler for the same `C` replaces the first —
    /// the bus enforces "single handler per type" by construction, not by
    /// rejecting the second registration, since registration happens once
    /// at service startup under the caller's control.
    pub fn register<C>(&mut self, handler: impl CommandHandler<C> + 'static)
    where
        C: Command + 'static,
    {
        self.handlers.insert(
            TypeId::of::<C>(),
            Box::new(TypedCommandHandler::<C, _>::new(handler)),
        );
    }

    /// Validate then dispatch a command to its registered handler.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidArgument`] if `cmd.validate()` fails — the
    ///   handler is never invoked in this case.
    /// - [`CoreError::NotRegistered`] if no handler was registered for `C`.
    /// - Whatever error the handler itself returns.
    #[tracing::instrument(skip(self, ctx, cmd), fields(command = cmd.command_name()))]
    pub async fn dispatch<C>(&self, ctx: &RequestContext, cmd: &mut C) -> Result<()>
    where
        C: Command + 'static,
    {
        cmd.validate()?;
        ctx.check_cancelled()?;

        let handler = self
            .handlers
            .get(&TypeId::of::<C>())
            .ok_or_else(|| CoreError::NotRegistered(cmd.command_name().to_string()))?;

        handler.handle_erased(ctx, cmd as &mut dyn Any).await
    }
}

/// Dispatches queries to their single registered handler and returns the
/// handler's output, side-effect free.
#[derive(Default)]
pub struct QueryBus {
    handlers: HashMap<TypeId, Box<dyn ErasedQueryHandler>>,
}

impl QueryBus {
    /// Create an empty query bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register the single handler for query type `Q`.
    pub fn register<Q>(&mut self, handler: impl QueryHandler<Q> + 'static)
    where
        Q: Query + 'static,
    {
        self.handlers.insert(
            TypeId::of::<Q>(),
            Box::new(TypedQueryHandler::<Q, _>::new(handler)),
        );
    }

    /// Dispatch a query to its registered handler.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotRegistered`] if no handler was registered for `Q`,
    /// or whatever error the handler produces.
    ///
    /// # Panics
    ///
    /// Never panics: the internal downcast from the type-erased result
    /// back to `Q::Output` is guaranteed to succeed because the handler
    /// was registered against the same `Q`.
    #[tracing::instrument(skip(self, ctx, query), fields(query = query.query_name()))]
    pub async fn dispatch<Q>(&self, ctx: &RequestContext, query: &Q) -> Result<Q::Output>
    where
        Q: Query + 'static,
    {
        ctx.check_cancelled()?;

        let handler = self
            .handlers
            .get(&TypeId::of::<Q>())
            .ok_or_else(|| CoreError::NotRegistered(query.query_name().to_string()))?;

        let boxed = handler.handle_erased(ctx, query as &dyn Any).await?;
        Ok(*boxed
            .downcast::<Q::Output>()
            .expect("query handler output type matches its registration"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)] // Test code can use unwrap/expect/panic
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;

    #[derive(Debug)]
    struct Echo {
        value: i32,
    }
    impl Query for Echo {
        type Output = i32;
        fn query_name(&self) -> &'static str {
            "Echo"
        }
    }
    struct EchoHandler;
    impl QueryHandler<Echo> for EchoHandler {
        fn handle<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            query: &'a Echo,
        ) -> Pin<Box<dyn Future<Output = Result<i32>> + Send + 'a>> {
            Box::pin(async move { Ok(query.value) })
        }
    }

    #[derive(Debug)]
    struct AlwaysInvalid;
    impl Command for AlwaysInvalid {
        fn command_name(&self) -> &'static str {
            "AlwaysInvalid"
        }
        fn validate(&self) -> Result<()> {
            Err(CoreError::invalid("nope"))
        }
    }
    struct NeverCalledHandler;
    impl CommandHandler<AlwaysInvalid> for NeverCalledHandler {
        fn handle<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            _cmd: &'a mut AlwaysInvalid,
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move { panic!("handler must not run when validation fails") })
        }
    }

    #[tokio::test]
    async fn query_bus_dispatches_to_registered_handler() {
        let mut bus = QueryBus::new();
        bus.register(EchoHandler);
        let ctx = RequestContext::new(None);
        let result = bus.dispatch(&ctx, &Echo { value: 42 }).await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn command_bus_returns_not_registered_for_unknown_command() {
        #[derive(Debug)]
        struct Unregistered;
        impl Command for Unregistered {
            fn command_name(&self) -> &'static str {
                "Unregistered"
            }
            fn validate(&self) -> Result<()> {
                Ok(())
            }
        }

        let bus = CommandBus::new();
        let ctx = RequestContext::new(None);
        let mut cmd = Unregistered;
        let err = bus.dispatch(&ctx, &mut cmd).await.unwrap_err();
        assert!(matches!(err, CoreError::NotRegistered(_)));
    }

    #[tokio::test]
    async fn command_bus_short_circuits_on_validation_failure() {
        let mut bus = CommandBus::new();
        bus.register(NeverCalledHandler);
        let ctx = RequestContext::new(None);
        let mut cmd = AlwaysInvalid;
        let err = bus.dispatch(&ctx, &mut cmd).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
    }
}
