// src/core/commands/echo.rs

use super::wrong_arity;
use crate::core::handler::{Command, Handler};
use crate::core::protocol::ResponseWriter;
use async_trait::async_trait;

/// `ECHO message`
#[derive(Debug, Clone, Copy, Default)]
pub struct Echo;

#[async_trait]
impl Handler for Echo {
    async fn serve(&self, w: &mut ResponseWriter, cmd: &Command) {
        match cmd.args() {
            [message] => w.append_bulk(message),
            _ => w.append_error(&wrong_arity(cmd.name())),
        }
    }
}
