// src/core/commands/mod.rs

//! Built-in diagnostic commands.

mod client;
mod echo;
mod info;
mod ping;

pub use client::Client;
pub use echo::Echo;
pub use info::{Info, render as render_info};
pub use ping::Ping;

use crate::server::Server;

/// Registers `PING`, `ECHO`, `INFO` and `CLIENT`.
pub fn register_builtins(server: &Server) {
    server.handle("ping", Ping);
    server.handle("echo", Echo);
    server.handle("info", Info::new(server.state()));
    server.handle("client", Client::new(server.state()));
}

/// The arity error for `cmd`.
pub fn wrong_arity(cmd: &str) -> String {
    format!(
        "ERR wrong number of arguments for '{}' command",
        cmd.to_ascii_lowercase()
    )
}
