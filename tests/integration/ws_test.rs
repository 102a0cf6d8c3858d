//! Integration tests for the WebSocket protocol.

mod helpers;

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(addr: std::net::SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("Failed to connect");
    client
}

async fn send(client: &mut Client, command: Value) {
    client
        .send(Message::Text(command.to_string().into()))
        .await
        .expect("Failed to send");
}

async fn send_raw(client: &mut Client, raw: &str) {
    client
        .send(Message::Text(raw.to_string().into()))
        .await
        .expect("Failed to send");
}

/// Next JSON text frame, or `None` if nothing arrives within `wait`.
async fn recv(client: &mut Client, wait: Duration) -> Option<Value> {
    loop {
        let frame = tokio::time::timeout(wait, client.next()).await.ok()??;
        match frame.expect("WebSocket error") {
            Message::Text(text) => {
                return Some(serde_json::from_str(text.as_str()).expect("Non-JSON frame"));
            }
            Message::Close(_) => return None,
            _ => continue,
        }
    }
}

const WAIT: Duration = Duration::from_secs(2);

/// Polls `cond` until it holds, failing after two seconds.
async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Timed out waiting for {what}");
}

#[tokio::test]
async fn test_lobby_scenario() {
    let app = helpers::TestApp::new();
    let (addr, _shutdown) = app.spawn().await;

    let mut s1 = connect(addr).await;
    let mut s2 = connect(addr).await;

    send(&mut s1, json!({ "join": "lobby" })).await;
    wait_until("join", || app.engine.registry.info("lobby").members == 1).await;
    send(&mut s2, json!({ "listen": ["lobby"] })).await;
    assert_eq!(recv(&mut s2, WAIT).await, Some(json!({ "lobby": 1 })));

    drop(s1);
    assert_eq!(recv(&mut s2, WAIT).await, Some(json!({ "lobby": 0 })));

    send(&mut s2, json!({ "listen": [] })).await;
    assert_eq!(recv(&mut s2, WAIT).await, Some(json!({})));

    tokio::time::sleep(app.config.meter.cleanup_delay() + app.tick() * 4).await;
    assert_eq!(app.engine.registry.namespace_count(), 0);
}

#[tokio::test]
async fn test_join_and_listen_in_one_command() {
    let app = helpers::TestApp::new();
    let (addr, _shutdown) = app.spawn().await;
    let mut client = connect(addr).await;

    send(&mut client, json!({ "join": "a", "listen": ["a", "b"] })).await;
    assert_eq!(recv(&mut client, WAIT).await, Some(json!({ "a": 1, "b": 0 })));

    // Own membership is already reflected, so nothing else is pushed.
    assert_eq!(recv(&mut client, app.tick() * 4).await, None);
}

#[tokio::test]
async fn test_changes_are_batched_per_listener() {
    let app = helpers::TestApp::new();
    let (addr, _shutdown) = app.spawn().await;

    let mut watcher = connect(addr).await;
    send(&mut watcher, json!({ "listen": ["a", "b"] })).await;
    assert_eq!(recv(&mut watcher, WAIT).await, Some(json!({ "a": 0, "b": 0 })));

    let mut members = Vec::new();
    for name in ["a", "a", "b"] {
        let mut client = connect(addr).await;
        send(&mut client, json!({ "join": name })).await;
        members.push(client);
    }

    let mut seen = serde_json::Map::new();
    while seen.get("a") != Some(&json!(2)) || seen.get("b") != Some(&json!(1)) {
        let Some(Value::Object(update)) = recv(&mut watcher, WAIT).await else {
            panic!("Expected a counts update, last state {seen:?}");
        };
        seen.extend(update);
    }
}

#[tokio::test]
async fn test_error_payloads() {
    let app = helpers::TestApp::new();
    let (addr, _shutdown) = app.spawn().await;
    let mut client = connect(addr).await;

    send_raw(&mut client, "{not json").await;
    assert_eq!(
        recv(&mut client, WAIT).await,
        Some(json!({ "err": "Invalid JSON command" }))
    );

    send(&mut client, json!({ "join": 42 })).await;
    assert_eq!(
        recv(&mut client, WAIT).await,
        Some(json!({ "err": "Invalid join value: must be a string" }))
    );

    send(&mut client, json!({ "join": "x".repeat(51) })).await;
    assert_eq!(
        recv(&mut client, WAIT).await,
        Some(json!({ "err": "Maximum length for namespace is 50" }))
    );

    send(&mut client, json!({ "listen": "lobby" })).await;
    assert_eq!(
        recv(&mut client, WAIT).await,
        Some(json!({ "err": "Invalid listen value: must be an array" }))
    );

    let many: Vec<String> = (0..21).map(|i| format!("ns{i}")).collect();
    send(&mut client, json!({ "listen": many })).await;
    assert_eq!(
        recv(&mut client, WAIT).await,
        Some(json!({ "err": "Maximum listenable namespaces is 20" }))
    );

    // The connection survives rejected commands.
    send(&mut client, json!({ "listen": ["ok"] })).await;
    assert_eq!(recv(&mut client, WAIT).await, Some(json!({ "ok": 0 })));
    assert_eq!(app.engine.registry.namespace_count(), 1);
}

#[tokio::test]
async fn test_disconnect_releases_membership() {
    let app = helpers::TestApp::new();
    let (addr, _shutdown) = app.spawn().await;

    let mut client = connect(addr).await;
    send(&mut client, json!({ "join": "lobby" })).await;

    wait_until("join", || app.engine.registry.info("lobby").members == 1).await;

    client.close(None).await.expect("Failed to close");
    drop(client);

    wait_until("unregister", || app.engine.sessions.session_count() == 0).await;
    assert_eq!(app.engine.registry.info("lobby").to_string(), "0:1");
}
