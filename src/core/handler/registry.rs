// src/core/handler/registry.rs

use super::{
    Command, CommandHandler, CommandStream, Handler, HandlerFn, StreamHandler, StreamHandlerFn,
};
use crate::core::protocol::ResponseWriter;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps lower-cased command names to their handlers.
///
/// Lookups take a shared lock and clone the handler out, so no lock is held
/// while a handler runs and registrations can happen at any time.
#[derive(Default)]
pub struct CommandRegistry {
    commands: RwLock<HashMap<String, CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, replacing any previous registration.
    pub fn register(&self, name: &str, handler: CommandHandler) {
        self.commands
            .write()
            .insert(name.to_ascii_lowercase(), handler);
    }

    pub fn handle<H>(&self, name: &str, handler: H)
    where
        H: Handler + 'static,
    {
        self.register(name, CommandHandler::Unary(Arc::new(handler)));
    }

    pub fn handle_fn<F>(&self, name: &str, f: F)
    where
        F: Fn(&mut ResponseWriter, &Command) + Send + Sync + 'static,
    {
        self.handle(name, HandlerFn(f));
    }

    pub fn handle_stream<H>(&self, name: &str, handler: H)
    where
        H: StreamHandler + 'static,
    {
        self.register(name, CommandHandler::Stream(Arc::new(handler)));
    }

    pub fn handle_stream_fn<F>(&self, name: &str, f: F)
    where
        F: for<'a, 'b> Fn(&'a mut ResponseWriter, &'a mut CommandStream<'b>) -> BoxFuture<'a, ()>
            + Send
            + Sync
            + 'static,
    {
        self.handle_stream(name, StreamHandlerFn(f));
    }

    /// Finds the handler for `name`, ignoring case.
    pub fn lookup(&self, name: &str) -> Option<CommandHandler> {
        let commands = self.commands.read();
        match commands.get(name) {
            Some(handler) => Some(handler.clone()),
            None => commands.get(&name.to_ascii_lowercase()).cloned(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.commands.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.read().is_empty()
    }

    /// Registered names in lexical order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }
}
