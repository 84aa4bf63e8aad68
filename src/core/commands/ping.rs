// src/core/commands/ping.rs

use super::wrong_arity;
use crate::core::handler::{Command, Handler};
use crate::core::protocol::ResponseWriter;
use async_trait::async_trait;

/// `PING [message]`
#[derive(Debug, Clone, Copy, Default)]
pub struct Ping;

#[async_trait]
impl Handler for Ping {
    async fn serve(&self, w: &mut ResponseWriter, cmd: &Command) {
        match cmd.args() {
            [] => w.append_inline_string("PONG"),
            [message] => w.append_bulk(message),
            _ => w.append_error(&wrong_arity(cmd.name())),
        }
    }
}
