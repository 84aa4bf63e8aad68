// tests/integration/streaming_test.rs

//! Streaming handlers pull their own arguments; whatever they leave on the
//! wire must not corrupt the next command.

use super::test_helpers::{TestServer, bulk, error, simple};
use async_trait::async_trait;
use futures::FutureExt;
use respire::core::protocol::RespFrame;
use respire::{CommandStream, ResponseWriter, StreamHandler};

/// Replies with the total byte length of every argument.
struct Sum;

#[async_trait]
impl StreamHandler for Sum {
    async fn serve_stream(&self, w: &mut ResponseWriter, cmd: &mut CommandStream<'_>) {
        let mut total = 0;
        loop {
            match cmd.next_arg().await {
                Ok(Some(arg)) => total += arg.len(),
                Ok(None) => break,
                Err(e) => {
                    w.append_error(&format!("ERR {e}"));
                    return;
                }
            }
        }
        w.append_int(total as i64);
    }
}

/// Replies with the number of arguments it was given, reading none of them.
struct Peek;

#[async_trait]
impl StreamHandler for Peek {
    async fn serve_stream(&self, w: &mut ResponseWriter, cmd: &mut CommandStream<'_>) {
        w.append_int(cmd.remaining() as i64);
    }
}

/// Echoes the first argument and leaves the rest unread.
struct First;

#[async_trait]
impl StreamHandler for First {
    async fn serve_stream(&self, w: &mut ResponseWriter, cmd: &mut CommandStream<'_>) {
        match cmd.next_arg().await {
            Ok(Some(arg)) => w.append_bulk(&arg),
            Ok(None) => w.append_nil(),
            Err(e) => w.append_error(&format!("ERR {e}")),
        }
    }
}

async fn streaming_server() -> TestServer {
    let server = TestServer::start().await;
    server.server.handle_stream("sum", Sum);
    server.server.handle_stream("peek", Peek);
    server.server.handle_stream("first", First);
    server
}

#[tokio::test]
async fn test_stream_handler_reads_every_argument() {
    let server = streaming_server().await;
    let mut client = server.connect().await;

    assert_eq!(
        client.call(&["SUM", "ab", "cde", ""]).await,
        RespFrame::Integer(5)
    );
    assert_eq!(client.call(&["SUM"]).await, RespFrame::Integer(0));
}

#[tokio::test]
async fn test_unread_arguments_are_discarded() {
    let server = streaming_server().await;
    let mut client = server.connect().await;

    let mut batch = RespFrame::command(["PEEK", "a", "b", "c"]).encode_to_vec();
    batch.extend(RespFrame::command(["PING"]).encode_to_vec());
    client.send_raw(&batch).await;

    assert_eq!(client.read().await, RespFrame::Integer(3));
    assert_eq!(client.read().await, simple("PONG"));
}

#[tokio::test]
async fn test_partially_read_arguments_are_discarded() {
    let server = streaming_server().await;
    let mut client = server.connect().await;

    let mut batch = RespFrame::command(["FIRST", "one", "two", "three"]).encode_to_vec();
    batch.extend(RespFrame::command(["ECHO", "next"]).encode_to_vec());
    client.send_raw(&batch).await;

    assert_eq!(client.read().await, bulk("one"));
    assert_eq!(client.read().await, bulk("next"));
}

#[tokio::test]
async fn test_large_unread_payload_is_skipped() {
    let server = streaming_server().await;
    let mut client = server.connect().await;

    let payload = "p".repeat(2 * 1024 * 1024);
    let mut batch = RespFrame::command(["PEEK", payload.as_str(), payload.as_str()]).encode_to_vec();
    batch.extend(RespFrame::command(["ECHO", "still here"]).encode_to_vec());
    client.send_raw(&batch).await;

    assert_eq!(client.read().await, RespFrame::Integer(2));
    assert_eq!(client.read().await, bulk("still here"));
}

#[tokio::test]
async fn test_stream_handler_with_inline_command() {
    let server = streaming_server().await;
    let mut client = server.connect().await;

    client.send_raw(b"sum abc de\r\nfirst x y\r\nPING\r\n").await;

    assert_eq!(client.read().await, RespFrame::Integer(5));
    assert_eq!(client.read().await, bulk("x"));
    assert_eq!(client.read().await, simple("PONG"));
}

#[tokio::test]
async fn test_malformed_streamed_argument_closes_connection() {
    let server = streaming_server().await;
    let mut client = server.connect().await;

    client.send_raw(b"*2\r\n$4\r\nPEEK\r\n:12\r\n").await;

    // The handler replies first; discarding the bad argument then fails.
    assert_eq!(client.read().await, RespFrame::Integer(1));
    assert_eq!(
        client.read().await,
        error("ERR Protocol error: expected '$', got ':'")
    );
    client.assert_closed().await;
}

#[tokio::test]
async fn test_stream_closure_handler() {
    let server = TestServer::start().await;
    server.server.handle_stream_fn("head", |w, cmd| {
        async move {
            match cmd.next_arg().await {
                Ok(Some(arg)) => w.append_bulk(&arg),
                Ok(None) => w.append_nil(),
                Err(e) => w.append_error(&format!("ERR {e}")),
            }
        }
        .boxed()
    });
    let mut client = server.connect().await;

    let mut batch = RespFrame::command(["HEAD", "one", "two"]).encode_to_vec();
    batch.extend(RespFrame::command(["HEAD"]).encode_to_vec());
    batch.extend(RespFrame::command(["ECHO", "next"]).encode_to_vec());
    client.send_raw(&batch).await;

    assert_eq!(client.read().await, bulk("one"));
    assert_eq!(client.read().await, RespFrame::Null);
    assert_eq!(client.read().await, bulk("next"));
}
