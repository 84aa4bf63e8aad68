// src/lib.rs

pub mod config;
pub mod connection;
pub mod core;
pub mod server;

// Re-export
pub use crate::config::Config;
pub use crate::core::protocol::{RespFrame, ResponseWriter};
pub use crate::core::{Command, CommandStream, Handler, ServeError, StreamHandler};
pub use crate::server::Server;
