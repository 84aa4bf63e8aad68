// src/connection/mod.rs

//! Manages the lifecycle of a single client connection: registration, the
//! pipeline loop and the dispatch of each command to its handler.

mod dispatch;
mod guard;
mod handler;
mod session;

pub use dispatch::unknown_command;
pub use guard::ConnectionGuard;
pub use handler::ConnectionHandler;
pub use session::SessionHandle;
