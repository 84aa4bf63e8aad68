// src/server/mod.rs

//! The dispatcher: owns the registries, runs the accept loop and drains
//! connections on demand.

use crate::config::Config;
use crate::core::ServeError;
use crate::core::handler::{Command, CommandRegistry, CommandStream, Handler, StreamHandler};
use crate::core::protocol::ResponseWriter;
use crate::core::state::{ClientRegistry, ServerState, ServerStats};
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

mod connection_loop;
mod release;

pub use connection_loop::configure_socket;

/// A RESP server. Cloning is cheap and every clone drives the same state.
///
/// ```no_run
/// # async fn demo() -> Result<(), respire::core::ServeError> {
/// use respire::{Config, Server};
///
/// let server = Server::new(Config::default());
/// server.handle_fn("ping", |w, _cmd| w.append_inline_string("PONG"));
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:7878").await?;
/// server.serve(listener).await
/// # }
/// ```
#[derive(Clone)]
pub struct Server {
    state: Arc<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            state: Arc::new(ServerState::new(config)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.state.config
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.state.commands
    }

    /// The registry of connected clients.
    pub fn info(&self) -> &ClientRegistry {
        &self.state.clients
    }

    pub fn stats(&self) -> &ServerStats {
        &self.state.stats
    }

    /// Registers a handler that receives the full argument list.
    pub fn handle<H>(&self, name: &str, handler: H)
    where
        H: Handler + 'static,
    {
        self.state.commands.handle(name, handler);
    }

    /// Registers a closure as a handler.
    pub fn handle_fn<F>(&self, name: &str, f: F)
    where
        F: Fn(&mut ResponseWriter, &Command) + Send + Sync + 'static,
    {
        self.state.commands.handle_fn(name, f);
    }

    /// Registers a handler that pulls its arguments off the connection.
    pub fn handle_stream<H>(&self, name: &str, handler: H)
    where
        H: StreamHandler + 'static,
    {
        self.state.commands.handle_stream(name, handler);
    }

    /// Registers a closure as a streaming handler. The closure returns a boxed
    /// future, usually built with `async move { .. }.boxed()`.
    pub fn handle_stream_fn<F>(&self, name: &str, f: F)
    where
        F: for<'a, 'b> Fn(&'a mut ResponseWriter, &'a mut CommandStream<'b>) -> BoxFuture<'a, ()>
            + Send
            + Sync
            + 'static,
    {
        self.state.commands.handle_stream_fn(name, f);
    }

    /// Accepts connections on `listener` until accepting fails.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServeError> {
        if let Ok(addr) = listener.local_addr() {
            info!("Server listening on {}", addr);
        }
        connection_loop::run(self.state.clone(), listener).await
    }

    /// Like [`serve`](Self::serve), but stops accepting once `shutdown`
    /// resolves and then drains every open connection.
    pub async fn serve_with_shutdown<F>(
        &self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), ServeError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            res = self.serve(listener) => res,
            _ = shutdown => {
                info!("Shutdown requested, draining connections.");
                self.release().await;
                Ok(())
            }
        }
    }
}
