// src/core/commands/info.rs

use super::wrong_arity;
use crate::core::handler::{Command, Handler};
use crate::core::protocol::ResponseWriter;
use crate::core::state::ServerState;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{Arc, Weak};

const SECTIONS: [&str; 4] = ["server", "clients", "stats", "commandstats"];

/// `INFO [section]`
pub struct Info {
    state: Weak<ServerState>,
}

impl Info {
    pub fn new(state: &Arc<ServerState>) -> Self {
        Self {
            state: Arc::downgrade(state),
        }
    }
}

#[async_trait]
impl Handler for Info {
    async fn serve(&self, w: &mut ResponseWriter, cmd: &Command) {
        let section = match cmd.args() {
            [] => None,
            [section] => Some(String::from_utf8_lossy(section).to_ascii_lowercase()),
            _ => {
                w.append_error(&wrong_arity(cmd.name()));
                return;
            }
        };
        let Some(state) = self.state.upgrade() else {
            w.append_error("ERR server is shutting down");
            return;
        };
        w.append_bulk_string(&render(&state, section.as_deref()));
    }
}

/// Renders the requested section, or every section for `None` and `"all"`.
pub fn render(state: &ServerState, section: Option<&str>) -> String {
    let wanted: Vec<&str> = match section {
        None | Some("all") | Some("everything") => SECTIONS.to_vec(),
        Some(name) => SECTIONS.iter().copied().filter(|s| *s == name).collect(),
    };

    let mut out = String::new();
    for name in wanted {
        if !out.is_empty() {
            out.push_str("\r\n");
        }
        match name {
            "server" => render_server(state, &mut out),
            "clients" => render_clients(state, &mut out),
            "stats" => render_stats(state, &mut out),
            _ => render_commandstats(state, &mut out),
        }
    }
    out
}

fn render_server(state: &ServerState, out: &mut String) {
    out.push_str("# Server\r\n");
    let _ = write!(out, "respire_version:{}\r\n", env!("RESPIRE_BUILD_VERSION"));
    let _ = write!(out, "process_id:{}\r\n", std::process::id());
    let _ = write!(out, "tcp_port:{}\r\n", state.config.port);
    let _ = write!(
        out,
        "uptime_in_seconds:{}\r\n",
        state.stats.uptime().as_secs()
    );
}

fn render_clients(state: &ServerState, out: &mut String) {
    out.push_str("# Clients\r\n");
    let _ = write!(out, "connected_clients:{}\r\n", state.clients.len());
}

fn render_stats(state: &ServerState, out: &mut String) {
    out.push_str("# Stats\r\n");
    let stats = &state.stats;
    let _ = write!(
        out,
        "total_connections_received:{}\r\n",
        stats.get_total_connections()
    );
    let _ = write!(
        out,
        "total_commands_processed:{}\r\n",
        stats.get_total_commands()
    );
    let _ = write!(
        out,
        "total_connections_released:{}\r\n",
        stats.get_total_released()
    );
}

/// Per-command totals over the clients connected right now.
fn render_commandstats(state: &ServerState, out: &mut String) {
    out.push_str("# Commandstats\r\n");
    let mut totals: BTreeMap<String, u64> = BTreeMap::new();
    for info in state.clients.all() {
        for (name, count) in info.commands {
            *totals.entry(name).or_default() += count;
        }
    }
    for (name, calls) in totals {
        let _ = write!(out, "cmdstat_{name}:calls={calls}\r\n");
    }
}
