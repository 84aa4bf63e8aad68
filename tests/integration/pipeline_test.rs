// tests/integration/pipeline_test.rs

//! End-to-end dispatch over a real TCP connection: routing, pipelining,
//! error replies and client bookkeeping.

use super::test_helpers::{TestServer, bulk, error, eventually, simple};
use async_trait::async_trait;
use respire::config::Config;
use respire::core::protocol::RespFrame;
use respire::{Command, Handler, ResponseWriter};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[tokio::test]
async fn test_ping_and_echo() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    assert_eq!(client.call(&["PING"]).await, simple("PONG"));
    assert_eq!(client.call(&["PING", "hello"]).await, bulk("hello"));
    assert_eq!(client.call(&["ECHO", "hi there"]).await, bulk("hi there"));
}

#[tokio::test]
async fn test_command_names_are_case_insensitive() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    assert_eq!(client.call(&["PiNg"]).await, simple("PONG"));
    assert_eq!(client.call(&["ping"]).await, simple("PONG"));
    assert_eq!(client.call(&["eChO", "x"]).await, bulk("x"));
}

#[tokio::test]
async fn test_pipelined_replies_keep_request_order() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    let mut batch = Vec::new();
    for i in 0..100 {
        let msg = format!("msg-{i}");
        batch.extend(RespFrame::command(["ECHO", msg.as_str()]).encode_to_vec());
    }
    client.send_raw(&batch).await;

    for i in 0..100 {
        assert_eq!(client.read().await, bulk(&format!("msg-{i}")));
    }
}

#[tokio::test]
async fn test_unknown_command_keeps_connection_open() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    assert_eq!(
        client.call(&["FOO", "a", "b"]).await,
        error("ERR unknown command 'FOO'")
    );
    assert_eq!(client.call(&["PING"]).await, simple("PONG"));
}

#[tokio::test]
async fn test_unknown_command_arguments_are_skipped() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    let payload = "x".repeat(100 * 1024);
    let mut batch = RespFrame::command(["NOPE", payload.as_str(), "tail"]).encode_to_vec();
    batch.extend(RespFrame::command(["ECHO", "after"]).encode_to_vec());
    client.send_raw(&batch).await;

    assert_eq!(client.read().await, error("ERR unknown command 'NOPE'"));
    assert_eq!(client.read().await, bulk("after"));
}

#[tokio::test]
async fn test_inline_commands() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    client.send_raw(b"PING\r\n\r\nECHO   hello\r\n").await;

    assert_eq!(client.read().await, simple("PONG"));
    assert_eq!(client.read().await, bulk("hello"));
}

#[tokio::test]
async fn test_protocol_error_replies_then_closes() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    client.send_raw(b"*abc\r\n").await;

    assert_eq!(
        client.read().await,
        error("ERR Protocol error: invalid multibulk length")
    );
    client.assert_closed().await;
    server.wait_for_clients(0).await;
}

#[tokio::test]
async fn test_protocol_error_stops_the_pipeline() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    client
        .send_raw(b"*1\r\n$4\r\nPING\r\n*2\r\n$4\r\nECHO\r\n#2\r\nhi\r\n*1\r\n$4\r\nPING\r\n")
        .await;

    assert_eq!(client.read().await, simple("PONG"));
    assert_eq!(
        client.read().await,
        error("ERR Protocol error: expected '$', got '#'")
    );
    client.assert_closed().await;
}

#[tokio::test]
async fn test_wrong_arity_replies_with_error() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    assert_eq!(
        client.call(&["ECHO"]).await,
        error("ERR wrong number of arguments for 'echo' command")
    );
    assert_eq!(
        client.call(&["PING", "a", "b"]).await,
        error("ERR wrong number of arguments for 'ping' command")
    );
}

#[tokio::test]
async fn test_handler_errors_do_not_close_the_connection() {
    let server = TestServer::start().await;
    server
        .server
        .handle_fn("fail", |w, _cmd| w.append_error("ERR custom failure"));
    let mut client = server.connect().await;

    assert_eq!(client.call(&["FAIL"]).await, error("ERR custom failure"));
    assert_eq!(client.call(&["PING"]).await, simple("PONG"));
}

#[tokio::test]
async fn test_handlers_registered_while_serving_are_visible() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    assert_eq!(
        client.call(&["LATE"]).await,
        error("ERR unknown command 'LATE'")
    );
    server.server.handle_fn("late", |w, cmd| {
        w.append_int(cmd.arg_count() as i64);
    });
    assert_eq!(client.call(&["LATE", "a", "b"]).await, RespFrame::Integer(2));
}

#[tokio::test]
async fn test_client_registry_tracks_commands() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    client.call(&["PING"]).await;
    client.call(&["PING"]).await;
    client.call(&["ECHO", "x"]).await;
    client.call(&["UNKNOWN"]).await;

    let clients = server.server.info().all();
    assert_eq!(clients.len(), 1);
    let info = &clients[0];
    assert_eq!(info.last_command.as_deref(), Some("echo"));
    assert_eq!(info.commands.get("ping"), Some(&2));
    assert_eq!(info.commands.get("echo"), Some(&1));
    assert!(!info.commands.contains_key("unknown"));
    assert_eq!(info.total_commands(), 3);
    assert_eq!(server.server.stats().get_total_commands(), 3);
}

#[tokio::test]
async fn test_client_ids_are_unique_and_match_open_connections() {
    let server = TestServer::start().await;

    let mut clients = Vec::new();
    for _ in 0..5 {
        let mut client = server.connect().await;
        assert_eq!(client.call(&["PING"]).await, simple("PONG"));
        clients.push(client);
    }
    server.wait_for_clients(5).await;

    let ids: HashSet<u64> = server.server.info().all().iter().map(|c| c.id).collect();
    assert_eq!(ids.len(), 5);
    assert!(!ids.contains(&0));

    clients.truncate(3);
    server.wait_for_clients(3).await;
    assert_eq!(server.server.stats().get_total_connections(), 5);
}

#[tokio::test]
async fn test_client_list_and_info() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;
    client.call(&["PING"]).await;

    let RespFrame::BulkString(list) = client.call(&["CLIENT", "LIST"]).await else {
        panic!("CLIENT LIST should return a bulk string");
    };
    let list = String::from_utf8_lossy(&list).into_owned();
    assert_eq!(list.lines().count(), 1);
    assert!(list.starts_with("id="));
    assert!(list.contains("cmd=client"));

    let RespFrame::BulkString(info) = client.call(&["INFO", "clients"]).await else {
        panic!("INFO should return a bulk string");
    };
    let info = String::from_utf8_lossy(&info).into_owned();
    assert!(info.contains("connected_clients:1"));
    assert!(!info.contains("# Server"));

    assert_eq!(
        client.call(&["CLIENT", "KILL"]).await,
        error("ERR unknown subcommand 'KILL'")
    );
}

struct Gate(Arc<Notify>);

#[async_trait]
impl Handler for Gate {
    async fn serve(&self, w: &mut ResponseWriter, _cmd: &Command) {
        self.0.notified().await;
        w.append_ok();
    }
}

#[tokio::test]
async fn test_large_replies_are_flushed_before_the_next_command() {
    let config = Config {
        max_buffer_size: 1024,
        ..Config::default()
    };
    let server = TestServer::with_config(config).await;
    let gate = Arc::new(Notify::new());
    server.server.handle("gate", Gate(gate.clone()));
    server.server.handle_fn("big", |w, _cmd| {
        w.append_bulk(&[b'z'; 800]);
    });
    let mut client = server.connect().await;

    let mut batch = RespFrame::command(["BIG"]).encode_to_vec();
    batch.extend(RespFrame::command(["GATE"]).encode_to_vec());
    client.send_raw(&batch).await;

    // GATE is still blocked here, so BIG's reply can only come from an eager flush.
    let RespFrame::BulkString(big) = client.read().await else {
        panic!("BIG should return a bulk string");
    };
    assert_eq!(big.len(), 800);

    gate.notify_one();
    assert_eq!(client.read().await, simple("OK"));
}

#[tokio::test]
async fn test_small_replies_wait_for_the_batch() {
    let server = TestServer::start().await;
    let gate = Arc::new(Notify::new());
    server.server.handle("gate", Gate(gate.clone()));
    let mut client = server.connect().await;

    let mut batch = RespFrame::command(["PING"]).encode_to_vec();
    batch.extend(RespFrame::command(["GATE"]).encode_to_vec());
    client.send_raw(&batch).await;

    let server_ref = server.server.clone();
    eventually(move || {
        server_ref
            .info()
            .all()
            .first()
            .is_some_and(|c| c.last_command.as_deref() == Some("gate"))
    })
    .await
    .expect("GATE was never dispatched");
    client.assert_no_reply(Duration::from_millis(100)).await;

    gate.notify_one();
    assert_eq!(client.read().await, simple("PONG"));
    assert_eq!(client.read().await, simple("OK"));
}
