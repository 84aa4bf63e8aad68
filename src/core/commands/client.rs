// src/core/commands/client.rs

use super::wrong_arity;
use crate::core::handler::{Command, Handler};
use crate::core::protocol::ResponseWriter;
use crate::core::state::ServerState;
use async_trait::async_trait;
use std::sync::{Arc, Weak};

/// `CLIENT LIST`
///
/// Holds a weak reference because the handler itself lives inside the state's
/// command registry.
pub struct Client {
    state: Weak<ServerState>,
}

impl Client {
    pub fn new(state: &Arc<ServerState>) -> Self {
        Self {
            state: Arc::downgrade(state),
        }
    }
}

#[async_trait]
impl Handler for Client {
    async fn serve(&self, w: &mut ResponseWriter, cmd: &Command) {
        let Some(sub) = cmd.arg(0) else {
            w.append_error(&wrong_arity(cmd.name()));
            return;
        };
        let sub = String::from_utf8_lossy(sub);
        if !sub.eq_ignore_ascii_case("list") {
            w.append_error(&format!("ERR unknown subcommand '{sub}'"));
            return;
        }
        if cmd.arg_count() != 1 {
            w.append_error(&wrong_arity("client|list"));
            return;
        }
        let Some(state) = self.state.upgrade() else {
            w.append_error("ERR server is shutting down");
            return;
        };

        let mut list = String::new();
        for info in state.clients.all() {
            list.push_str(&info.to_string());
            list.push('\n');
        }
        w.append_bulk_string(&list);
    }
}
