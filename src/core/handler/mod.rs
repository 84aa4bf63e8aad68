// src/core/handler/mod.rs

//! Command handlers and the registry that routes command names to them.
//!
//! A handler comes in exactly one of two shapes. A [`Handler`] receives the
//! fully materialized argument list; a [`StreamHandler`] receives a
//! [`CommandStream`] and pulls arguments off the connection itself. The
//! [`CommandHandler`] enum closes over the two so dispatch is a plain `match`.

mod command;
mod registry;

pub use command::{Command, CommandStream};
pub use registry::CommandRegistry;

use crate::core::protocol::ResponseWriter;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Serves a command whose arguments have been read in full.
///
/// `cmd` is only valid for the duration of the call; handlers that need an
/// argument afterwards must clone it.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn serve(&self, w: &mut ResponseWriter, cmd: &Command);
}

/// Serves a command whose arguments are pulled lazily from the connection.
///
/// Whatever the handler leaves unread is discarded once it returns.
#[async_trait]
pub trait StreamHandler: Send + Sync {
    async fn serve_stream(&self, w: &mut ResponseWriter, cmd: &mut CommandStream<'_>);
}

/// Adapts a plain closure into a [`Handler`].
pub struct HandlerFn<F>(pub F);

#[async_trait]
impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut ResponseWriter, &Command) + Send + Sync,
{
    async fn serve(&self, w: &mut ResponseWriter, cmd: &Command) {
        (self.0)(w, cmd)
    }
}

/// Adapts a closure returning a boxed future into a [`StreamHandler`].
///
/// The closure needs its signature pinned by a higher-ranked `Fn` bound, so
/// it is usually registered through [`CommandRegistry::handle_stream_fn`].
///
/// ```
/// use futures::FutureExt;
/// use respire::{Config, Server};
///
/// let server = Server::new(Config::default());
/// server.handle_stream_fn("first", |w, cmd| {
///     async move {
///         match cmd.next_arg().await {
///             Ok(Some(arg)) => w.append_bulk(&arg),
///             _ => w.append_nil(),
///         }
///     }
///     .boxed()
/// });
/// ```
pub struct StreamHandlerFn<F>(pub F);

#[async_trait]
impl<F> StreamHandler for StreamHandlerFn<F>
where
    F: for<'a, 'b> Fn(&'a mut ResponseWriter, &'a mut CommandStream<'b>) -> BoxFuture<'a, ()>
        + Send
        + Sync,
{
    async fn serve_stream(&self, w: &mut ResponseWriter, cmd: &mut CommandStream<'_>) {
        (self.0)(w, cmd).await
    }
}

/// A registered handler, tagged by how it consumes its arguments.
#[derive(Clone)]
pub enum CommandHandler {
    Unary(Arc<dyn Handler>),
    Stream(Arc<dyn StreamHandler>),
}

impl CommandHandler {
    pub fn is_stream(&self) -> bool {
        matches!(self, CommandHandler::Stream(_))
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandHandler::Unary(_) => f.write_str("CommandHandler::Unary"),
            CommandHandler::Stream(_) => f.write_str("CommandHandler::Stream"),
        }
    }
}
