// src/core/protocol/writer.rs

//! Buffered reply writer handed to command handlers.

use super::resp_frame::{RespFrame, encode_bulk, encode_frame, encode_line, encode_number};
use crate::core::ServeError;
use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::{Instant, timeout_at};

/// Default size of the in-memory reply buffer.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 64 * 1024;

pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Accumulates encoded replies in memory until [`flush`](Self::flush) is called.
///
/// Appending never touches the socket, so handlers stay synchronous with
/// respect to I/O; the connection loop decides when bytes actually leave.
pub struct ResponseWriter {
    inner: BoxedWriter,
    buf: BytesMut,
    deadline: Option<Instant>,
}

impl ResponseWriter {
    pub fn new<W>(inner: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            inner: Box::new(inner),
            buf: BytesMut::with_capacity(4096),
            deadline: None,
        }
    }

    /// Bounds every subsequent flush by an absolute deadline.
    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
    }

    /// Number of bytes waiting to be flushed.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn append_ok(&mut self) {
        self.buf.extend_from_slice(b"+OK\r\n");
    }

    /// Appends a simple string; CR and LF are replaced by spaces.
    pub fn append_inline_string(&mut self, s: &str) {
        encode_line(b'+', sanitize(s).as_bytes(), &mut self.buf);
    }

    /// Appends an error reply; CR and LF are replaced by spaces.
    pub fn append_error(&mut self, msg: &str) {
        encode_line(b'-', sanitize(msg).as_bytes(), &mut self.buf);
    }

    pub fn append_int(&mut self, n: i64) {
        encode_number(b':', n, &mut self.buf);
    }

    pub fn append_bulk(&mut self, data: &[u8]) {
        encode_bulk(data, &mut self.buf);
    }

    pub fn append_bulk_string(&mut self, s: &str) {
        encode_bulk(s.as_bytes(), &mut self.buf);
    }

    pub fn append_nil(&mut self) {
        self.buf.extend_from_slice(b"$-1\r\n");
    }

    /// Appends an array header; the caller appends `len` elements after it.
    pub fn append_array_len(&mut self, len: usize) {
        encode_number(b'*', len as i64, &mut self.buf);
    }

    pub fn append_frame(&mut self, frame: &RespFrame) {
        encode_frame(frame, &mut self.buf);
    }

    /// Writes all buffered bytes to the underlying transport.
    pub async fn flush(&mut self) -> Result<(), ServeError> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let deadline = self.deadline;
        let write = async {
            self.inner.write_all(&self.buf).await?;
            self.inner.flush().await
        };
        match deadline {
            Some(deadline) => timeout_at(deadline, write).await??,
            None => write.await?,
        }
        self.buf.clear();
        Ok(())
    }
}

fn sanitize(s: &str) -> std::borrow::Cow<'_, str> {
    if s.contains(['\r', '\n']) {
        std::borrow::Cow::Owned(s.replace(['\r', '\n'], " "))
    } else {
        std::borrow::Cow::Borrowed(s)
    }
}
