// src/core/protocol/resp_frame.rs

//! The RESP reply frame and a `tokio_util` codec for it.
//!
//! The server side never decodes frames: requests are parsed incrementally by
//! [`RequestReader`](super::RequestReader). The decoder exists for the client
//! side of a connection (tools, tests, proxies) and the encoder is shared with
//! [`ResponseWriter`](super::ResponseWriter).

use crate::core::ServeError;
use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

pub(crate) const CRLF: &[u8] = b"\r\n";
pub(crate) const CRLF_LEN: usize = 2;

// Limits applied when decoding untrusted replies.
const MAX_FRAME_ELEMENTS: usize = 1_024 * 1_024;
const MAX_BULK_STRING_SIZE: usize = 512 * 1024 * 1024;
const MAX_RECURSION_DEPTH: usize = 256;

/// A single RESP value as it travels on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum RespFrame {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Bytes),
    Null,
    NullArray,
    Array(Vec<RespFrame>),
}

impl RespFrame {
    /// Builds an array of bulk strings, the shape of every RESP request.
    pub fn command<I, T>(parts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        RespFrame::Array(
            parts
                .into_iter()
                .map(|p| RespFrame::BulkString(Bytes::copy_from_slice(p.as_ref())))
                .collect(),
        )
    }

    /// Encodes the frame into a fresh byte vector.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(self, &mut buf);
        buf.to_vec()
    }
}

/// Appends the RESP encoding of `frame` to `dst`.
pub(crate) fn encode_frame(frame: &RespFrame, dst: &mut BytesMut) {
    match frame {
        RespFrame::SimpleString(s) => encode_line(b'+', s.as_bytes(), dst),
        RespFrame::Error(s) => encode_line(b'-', s.as_bytes(), dst),
        RespFrame::Integer(i) => encode_number(b':', *i, dst),
        RespFrame::BulkString(b) => encode_bulk(b, dst),
        RespFrame::Null => dst.extend_from_slice(b"$-1\r\n"),
        RespFrame::NullArray => dst.extend_from_slice(b"*-1\r\n"),
        RespFrame::Array(arr) => {
            encode_number(b'*', arr.len() as i64, dst);
            for frame in arr {
                encode_frame(frame, dst);
            }
        }
    }
}

pub(crate) fn encode_line(prefix: u8, line: &[u8], dst: &mut BytesMut) {
    dst.reserve(line.len() + 1 + CRLF_LEN);
    dst.extend_from_slice(&[prefix]);
    dst.extend_from_slice(line);
    dst.extend_from_slice(CRLF);
}

pub(crate) fn encode_number(prefix: u8, n: i64, dst: &mut BytesMut) {
    let mut fmt = itoa::Buffer::new();
    encode_line(prefix, fmt.format(n).as_bytes(), dst);
}

pub(crate) fn encode_bulk(data: &[u8], dst: &mut BytesMut) {
    encode_number(b'$', data.len() as i64, dst);
    dst.reserve(data.len() + CRLF_LEN);
    dst.extend_from_slice(data);
    dst.extend_from_slice(CRLF);
}

/// A `tokio_util::codec` implementation for `RespFrame`s.
#[derive(Debug, Default, Clone, Copy)]
pub struct RespFrameCodec;

impl Encoder<RespFrame> for RespFrameCodec {
    type Error = ServeError;

    fn encode(&mut self, item: RespFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&item, dst);
        Ok(())
    }
}

/// Why a decode attempt stopped.
enum DecodeError {
    /// More bytes are needed; nothing was consumed.
    Incomplete,
    Invalid(String),
}

impl Decoder for RespFrameCodec {
    type Item = RespFrame;
    type Error = ServeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut bytes = &src[..];
        match decode_recursive(&mut bytes, 0) {
            Ok(frame) => {
                let len = src.len() - bytes.len();
                src.advance(len);
                Ok(Some(frame))
            }
            Err(DecodeError::Incomplete) => Ok(None),
            Err(DecodeError::Invalid(msg)) => Err(ServeError::Protocol(msg)),
        }
    }
}

fn decode_recursive(bytes: &mut &[u8], depth: usize) -> Result<RespFrame, DecodeError> {
    if depth > MAX_RECURSION_DEPTH {
        return Err(DecodeError::Invalid("recursion depth limit exceeded".into()));
    }
    let Some(&prefix) = bytes.first() else {
        return Err(DecodeError::Incomplete);
    };
    *bytes = &bytes[1..];

    match prefix {
        b'+' => Ok(RespFrame::SimpleString(lossy(parse_line(bytes)?))),
        b'-' => Ok(RespFrame::Error(lossy(parse_line(bytes)?))),
        b':' => Ok(RespFrame::Integer(parse_int(parse_line(bytes)?)?)),
        b'$' => parse_bulk_string(bytes),
        b'*' => parse_array(bytes, depth),
        other => Err(DecodeError::Invalid(format!(
            "unexpected reply type '{}'",
            other as char
        ))),
    }
}

fn parse_line<'a>(bytes: &mut &'a [u8]) -> Result<&'a [u8], DecodeError> {
    let pos = find_crlf(bytes).ok_or(DecodeError::Incomplete)?;
    let line = &bytes[..pos];
    *bytes = &bytes[pos + CRLF_LEN..];
    Ok(line)
}

fn parse_int(line: &[u8]) -> Result<i64, DecodeError> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| DecodeError::Invalid(format!("invalid integer '{}'", lossy(line))))
}

fn parse_bulk_string(bytes: &mut &[u8]) -> Result<RespFrame, DecodeError> {
    let len = parse_int(parse_line(bytes)?)?;
    if len == -1 {
        return Ok(RespFrame::Null);
    }
    if len < 0 || len as usize > MAX_BULK_STRING_SIZE {
        return Err(DecodeError::Invalid("invalid bulk length".into()));
    }
    let len = len as usize;
    if bytes.len() < len + CRLF_LEN {
        return Err(DecodeError::Incomplete);
    }
    if &bytes[len..len + CRLF_LEN] != CRLF {
        return Err(DecodeError::Invalid("bulk string not terminated by CRLF".into()));
    }
    let data = Bytes::copy_from_slice(&bytes[..len]);
    *bytes = &bytes[len + CRLF_LEN..];
    Ok(RespFrame::BulkString(data))
}

fn parse_array(bytes: &mut &[u8], depth: usize) -> Result<RespFrame, DecodeError> {
    let len = parse_int(parse_line(bytes)?)?;
    if len == -1 {
        return Ok(RespFrame::NullArray);
    }
    if len < 0 || len as usize > MAX_FRAME_ELEMENTS {
        return Err(DecodeError::Invalid("invalid multibulk length".into()));
    }
    let mut frames = Vec::with_capacity(len as usize);
    for _ in 0..len {
        frames.push(decode_recursive(bytes, depth + 1)?);
    }
    Ok(RespFrame::Array(frames))
}

fn lossy(line: &[u8]) -> String {
    String::from_utf8_lossy(line).into_owned()
}

/// Finds the next CRLF sequence in a buffer.
pub(crate) fn find_crlf(src: &[u8]) -> Option<usize> {
    src.windows(CRLF_LEN).position(|window| window == CRLF)
}
