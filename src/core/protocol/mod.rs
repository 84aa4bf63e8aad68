// src/core/protocol/mod.rs

//! The RESP codec: an incremental request reader, a buffered reply writer and
//! a frame codec for the client side of a connection.

pub mod reader;
pub mod resp_frame;
pub mod writer;

pub use reader::RequestReader;
pub use resp_frame::{RespFrame, RespFrameCodec};
pub use writer::{DEFAULT_MAX_BUFFER_SIZE, ResponseWriter};
