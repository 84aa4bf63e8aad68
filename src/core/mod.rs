// src/core/mod.rs

//! The central module containing the codec, handlers and shared state.

pub mod commands;
pub mod errors;
pub mod handler;
pub mod protocol;
pub mod state;

pub use errors::ServeError;
pub use handler::{
    Command, CommandHandler, CommandStream, Handler, HandlerFn, StreamHandler, StreamHandlerFn,
};
