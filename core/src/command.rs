//! The `Command` contract (spec §4.1).
//!
//! A command is a typed payload carrying a stable name, a validation probe,
//! and — for create commands — a slot the handler writes the generated id
//! back onto so the transport layer can echo it.

use crate::context::RequestContext;
use crate::error::{CoreError, Result};
use std::any::Any;
use std::future::Future;
use std::pin::Pin;

/// A typed request to mutate state, dispatched through the [`crate::bus::CommandBus`].
///
/// # Contract
///
/// - [`Command::command_name`] is a stable identifier used for logging and
///   metrics labels; it is not used for dispatch routing (routing is by
///   concrete Rust type, see [`crate::bus::CommandBus`]).
/// - [`Command::validate`] runs before the handler is invoked. A command
///   that fails validation never reaches its handler.
/// - Commands carry no hidden state: re-dispatching a command that failed
///   mid-way is permitted and is the basis of retry semantics.
pub trait Command: Any + Send + Sync {
    /// Stable name for this command, e.g. `"CreateShortLink"`.
    fn command_name(&self) -> &'static str;

    /// Validate the command's fields before it reaches a handler.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] describing the first failing
    /// field.
    fn validate(&self) -> Result<()>;
}

/// Handler for a single concrete command type.
///
/// Exactly one handler may be registered per command type (spec §4.1:
/// "Registration associates a command's name with exactly one handler").
pub trait CommandHandler<C: Command>: Send + Sync {
    /// Execute the command against request-scoped dependencies.
    ///
    /// # Errors
    ///
    /// Returns any [`CoreError`] the business logic produces.
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut C,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Blanket helper for implementing [`CommandHandler`] with an `async fn`
/// body via a free function, used heavily in handler modules to keep
/// `impl CommandHandler` boilerplate out of every aggregate's business
/// logic.
#[macro_export]
macro_rules! command_handler {
    ($handler:ty, $command:ty, |$self:ident, $ctx:ident, $cmd:ident| $body:expr) => {
        impl $crate::command::CommandHandler<$command> for $handler {
            fn handle<'a>(
                &'a $self,
                $ctx: &'a $crate::context::RequestContext,
                $cmd: &'a mut $command,
            ) -> ::std::pin::Pin<
                Box<dyn ::std::future::Future<Output = $crate::error::Result<()>> + Send + 'a>,
            > {
                Box::pin(async move { $body })
            }
        }
    };
}

/// Internal type-erased adapter stored inside [`crate::bus::CommandBus`].
///
/// Downcasts the boxed command back to its concrete type before invoking
/// the strongly-typed [`CommandHandler`]. A mismatch is a programming
/// error (it would mean the bus registry keyed two different types to the
/// same slot) and is reported as [`CoreError::Internal`] rather than
/// panicking, since handlers run inside request-serving tasks.
pub(crate) trait ErasedCommandHandler: Send + Sync {
    fn handle_erased<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut dyn Any,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

pub(crate) struct TypedCommandHandler<C, H> {
    pub(crate) handler: H,
    _marker: std::marker::PhantomData<C>,
}

impl<C, H> TypedCommandHandler<C, H> {
    pub(crate) const fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<C, H> ErasedCommandHandler for TypedCommandHandler<C, H>
where
    C: Command + 'static,
    H: CommandHandler<C>,
{
    fn handle_erased<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut dyn Any,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let cmd = cmd.downcast_mut::<C>().ok_or_else(|| {
                CoreError::Internal("command type mismatch in bus registry".to_string())
            })?;
            self.handler.handle(ctx, cmd).await
        })
    }
}
