// src/connection/dispatch.rs

//! The dispatch step: one command from the wire to its handler and back.

use crate::core::ServeError;
use crate::core::handler::{Command, CommandHandler, CommandStream};
use crate::core::protocol::{RequestReader, ResponseWriter};
use crate::core::state::ServerState;
use tracing::debug;

/// Reply sent for a command name nobody registered.
pub fn unknown_command(name: &str) -> String {
    format!("ERR unknown command '{name}'")
}

/// Dispatches every command that has already arrived, and at least one.
///
/// Returns `Ok(false)` once the peer has closed the stream. Replies are only
/// buffered here; the caller flushes after the batch unless a single reply
/// pushed the buffer past the eager-flush threshold first.
pub(crate) async fn run_pipeline(
    state: &ServerState,
    session_id: u64,
    reader: &mut RequestReader,
    writer: &mut ResponseWriter,
) -> Result<bool, ServeError> {
    loop {
        if !dispatch_one(state, session_id, reader, writer).await? {
            return Ok(false);
        }
        if !reader.has_buffered() {
            return Ok(true);
        }
    }
}

/// Reads, routes and serves exactly one command.
pub(crate) async fn dispatch_one(
    state: &ServerState,
    session_id: u64,
    reader: &mut RequestReader,
    writer: &mut ResponseWriter,
) -> Result<bool, ServeError> {
    let Some(name) = reader.read_command_name().await? else {
        return Ok(false);
    };
    let norm = name.to_ascii_lowercase();

    let Some(handler) = state.commands.lookup(&norm) else {
        debug!("Session {}: unknown command '{}'", session_id, name);
        writer.append_error(&unknown_command(&name));
        reader.skip_command().await?;
        return Ok(true);
    };

    state.clients.record_command(session_id, &norm);
    state.stats.increment_total_commands();
    debug!(
        "Session {}: dispatching '{}' with {} argument(s)",
        session_id,
        norm,
        reader.remaining()
    );

    match handler {
        CommandHandler::Unary(handler) => {
            let args = reader.read_args().await?;
            let cmd = Command::new(name, args);
            handler.serve(writer, &cmd).await;
        }
        CommandHandler::Stream(handler) => {
            let mut stream = CommandStream::new(name, reader);
            handler.serve_stream(writer, &mut stream).await;
            stream.discard().await?;
        }
    }

    if writer.buffered() > state.config.flush_threshold() {
        debug!(
            "Session {}: {} reply bytes buffered, flushing early",
            session_id,
            writer.buffered()
        );
        writer.flush().await?;
    }
    Ok(true)
}
