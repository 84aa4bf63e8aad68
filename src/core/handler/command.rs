// src/core/handler/command.rs

use crate::core::ServeError;
use crate::core::protocol::RequestReader;
use bytes::Bytes;

/// A command with its complete argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    args: Vec<Bytes>,
}

impl Command {
    pub fn new(name: impl Into<String>, args: Vec<Bytes>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// The command name as sent by the client, case preserved.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    pub fn arg(&self, i: usize) -> Option<&Bytes> {
        self.args.get(i)
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }
}

/// A command whose arguments are still on the wire.
///
/// Arguments can be read once, in order. The stream borrows the connection's
/// reader, so it cannot outlive the handler call it was created for.
pub struct CommandStream<'a> {
    name: String,
    reader: &'a mut RequestReader,
}

impl<'a> CommandStream<'a> {
    pub fn new(name: impl Into<String>, reader: &'a mut RequestReader) -> Self {
        Self {
            name: name.into(),
            reader,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of arguments not yet read.
    pub fn remaining(&self) -> usize {
        self.reader.remaining()
    }

    pub async fn next_arg(&mut self) -> Result<Option<Bytes>, ServeError> {
        self.reader.next_arg().await
    }

    /// Drops every argument not yet read.
    pub(crate) async fn discard(&mut self) -> Result<(), ServeError> {
        self.reader.skip_command().await
    }
}
