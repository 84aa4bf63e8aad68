// src/core/protocol/reader.rs

//! Incremental request parsing.
//!
//! Unlike a frame decoder, `RequestReader` hands out one command at a time and
//! lets the caller pull arguments lazily. That is what makes streaming handlers
//! possible: a large `SET`-style payload never has to be materialized before the
//! handler decides what to do with it. The flip side is that the reader owns the
//! framing state, so whatever the caller leaves unread must be skipped before the
//! next command is parsed.

use super::resp_frame::{CRLF, CRLF_LEN, find_crlf};
use crate::core::ServeError;
use bytes::{Buf, Bytes, BytesMut};
use std::collections::VecDeque;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{Instant, timeout_at};

/// Max number of elements in a multibulk request.
pub const MAX_MULTIBULK_LENGTH: usize = 1_024 * 1_024;
/// Max size of a single bulk argument.
pub const MAX_BULK_LENGTH: usize = 512 * 1024 * 1024;
/// Max length of an unterminated request line.
pub const MAX_INLINE_SIZE: usize = 64 * 1024;

const READ_CHUNK: usize = 16 * 1024;

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Reads pipelined RESP requests (multibulk or inline) from a byte stream.
pub struct RequestReader {
    inner: BoxedReader,
    buf: BytesMut,
    /// Bulk arguments of the current command still on the wire.
    pending: usize,
    /// Arguments of the current inline command not yet handed out.
    inline: VecDeque<Bytes>,
    deadline: Option<Instant>,
    /// Set on the first failure; the stream position is unknown afterwards.
    failed: Option<ServeError>,
}

impl RequestReader {
    pub fn new<R>(inner: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            inner: Box::new(inner),
            buf: BytesMut::with_capacity(READ_CHUNK),
            pending: 0,
            inline: VecDeque::new(),
            deadline: None,
            failed: None,
        }
    }

    /// Bounds every subsequent read by an absolute deadline.
    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
    }

    /// True if bytes of a further request have already been received.
    pub fn has_buffered(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Number of arguments of the current command not yet consumed.
    pub fn remaining(&self) -> usize {
        self.pending + self.inline.len()
    }

    /// Reads the name of the next command.
    ///
    /// Unread arguments of the previous command are skipped first. Returns
    /// `Ok(None)` when the peer closes the stream between two commands.
    pub async fn read_command_name(&mut self) -> Result<Option<String>, ServeError> {
        self.check()?;
        let res = self.read_command_name_inner().await;
        self.track(res)
    }

    /// Pulls the next argument of the current command, `None` once exhausted.
    pub async fn next_arg(&mut self) -> Result<Option<Bytes>, ServeError> {
        self.check()?;
        let res = self.next_arg_inner().await;
        self.track(res)
    }

    /// Reads every remaining argument of the current command.
    pub async fn read_args(&mut self) -> Result<Vec<Bytes>, ServeError> {
        let mut args = Vec::with_capacity(self.remaining().min(1024));
        while let Some(arg) = self.next_arg().await? {
            args.push(arg);
        }
        Ok(args)
    }

    /// Discards the remaining arguments of the current command.
    pub async fn skip_command(&mut self) -> Result<(), ServeError> {
        self.check()?;
        let res = self.skip_remaining().await;
        self.track(res)
    }

    fn check(&self) -> Result<(), ServeError> {
        match &self.failed {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn track<T>(&mut self, res: Result<T, ServeError>) -> Result<T, ServeError> {
        if let Err(e) = &res {
            self.failed = Some(e.clone());
        }
        res
    }

    async fn read_command_name_inner(&mut self) -> Result<Option<String>, ServeError> {
        self.skip_remaining().await?;

        loop {
            let Some(line) = self.read_line().await? else {
                return Ok(None);
            };

            if line.first() == Some(&b'*') {
                let n = parse_length(&line[1..])
                    .filter(|n| *n <= MAX_MULTIBULK_LENGTH as i64)
                    .ok_or_else(|| ServeError::protocol("invalid multibulk length"))?;
                // Empty and null multibulk requests are ignored.
                if n <= 0 {
                    continue;
                }
                self.pending = n as usize;
                let name = self.read_bulk().await?;
                return Ok(Some(String::from_utf8_lossy(&name).into_owned()));
            }

            let mut parts = line
                .split(u8::is_ascii_whitespace)
                .filter(|p| !p.is_empty())
                .map(|p| line.slice_ref(p));
            let Some(name) = parts.next() else {
                continue;
            };
            self.inline = parts.collect();
            return Ok(Some(String::from_utf8_lossy(&name).into_owned()));
        }
    }

    async fn next_arg_inner(&mut self) -> Result<Option<Bytes>, ServeError> {
        if let Some(arg) = self.inline.pop_front() {
            return Ok(Some(arg));
        }
        if self.pending == 0 {
            return Ok(None);
        }
        self.read_bulk().await.map(Some)
    }

    async fn skip_remaining(&mut self) -> Result<(), ServeError> {
        self.inline.clear();
        while self.pending > 0 {
            self.skip_bulk().await?;
        }
        Ok(())
    }

    async fn read_bulk(&mut self) -> Result<Bytes, ServeError> {
        let len = self.read_bulk_header().await?;
        self.fill_to(len + CRLF_LEN).await?;
        if &self.buf[len..len + CRLF_LEN] != CRLF {
            return Err(ServeError::protocol("bulk argument not terminated by CRLF"));
        }
        let data = self.buf.split_to(len).freeze();
        self.buf.advance(CRLF_LEN);
        Ok(data)
    }

    /// Like `read_bulk`, but drops the payload chunk by chunk.
    async fn skip_bulk(&mut self) -> Result<(), ServeError> {
        let mut left = self.read_bulk_header().await?;
        loop {
            let n = left.min(self.buf.len());
            self.buf.advance(n);
            left -= n;
            if left == 0 {
                break;
            }
            if self.fill().await? == 0 {
                return Err(ServeError::unexpected_eof());
            }
        }
        self.fill_to(CRLF_LEN).await?;
        if &self.buf[..CRLF_LEN] != CRLF {
            return Err(ServeError::protocol("bulk argument not terminated by CRLF"));
        }
        self.buf.advance(CRLF_LEN);
        Ok(())
    }

    async fn read_bulk_header(&mut self) -> Result<usize, ServeError> {
        let line = self
            .read_line()
            .await?
            .ok_or_else(ServeError::unexpected_eof)?;
        match line.first() {
            Some(b'$') => {}
            Some(&c) => {
                return Err(ServeError::protocol(format!(
                    "expected '$', got '{}'",
                    c as char
                )));
            }
            None => return Err(ServeError::protocol("expected '$', got empty line")),
        }
        let len = parse_length(&line[1..])
            .filter(|n| (0..=MAX_BULK_LENGTH as i64).contains(n))
            .ok_or_else(|| ServeError::protocol("invalid bulk length"))?;
        self.pending -= 1;
        Ok(len as usize)
    }

    /// Reads up to the next CRLF, `None` on EOF with an empty buffer.
    async fn read_line(&mut self) -> Result<Option<Bytes>, ServeError> {
        let mut scanned = 0;
        loop {
            if let Some(pos) = find_crlf(&self.buf[scanned..]) {
                let line = self.buf.split_to(scanned + pos).freeze();
                self.buf.advance(CRLF_LEN);
                return Ok(Some(line));
            }
            if self.buf.len() > MAX_INLINE_SIZE {
                return Err(ServeError::protocol("too big inline request"));
            }
            // A CR at the very end may still be followed by its LF.
            scanned = self.buf.len().saturating_sub(1);
            if self.fill().await? == 0 {
                return if self.buf.is_empty() {
                    Ok(None)
                } else {
                    Err(ServeError::unexpected_eof())
                };
            }
        }
    }

    async fn fill_to(&mut self, n: usize) -> Result<(), ServeError> {
        if self.buf.len() < n {
            self.buf.reserve(n - self.buf.len());
        }
        while self.buf.len() < n {
            if self.fill().await? == 0 {
                return Err(ServeError::unexpected_eof());
            }
        }
        Ok(())
    }

    async fn fill(&mut self) -> Result<usize, ServeError> {
        self.buf.reserve(READ_CHUNK);
        let read = self.inner.read_buf(&mut self.buf);
        let n = match self.deadline {
            Some(deadline) => timeout_at(deadline, read).await??,
            None => read.await?,
        };
        Ok(n)
    }
}

fn parse_length(digits: &[u8]) -> Option<i64> {
    std::str::from_utf8(digits).ok()?.parse::<i64>().ok()
}
