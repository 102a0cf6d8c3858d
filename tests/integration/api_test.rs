//! Integration tests for the HTTP surfaces.

mod helpers;

use std::sync::Arc;

use http::StatusCode;
use serde_json::json;
use tokio::sync::mpsc;

use meter_realtime::connection::ClientSession;

fn session() -> Arc<ClientSession> {
    let (tx, _rx) = mpsc::channel(8);
    Arc::new(ClientSession::new(tx))
}

#[tokio::test]
async fn test_namespace_json_for_absent_namespace() {
    let app = helpers::TestApp::new();

    let response = app.get("/lobby.json").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type, "application/json");
    assert_eq!(response.body, json!("0:0"));
    assert_eq!(app.engine.registry.namespace_count(), 0);
}

#[tokio::test]
async fn test_namespace_json_reports_members_and_connections() {
    let app = helpers::TestApp::new();
    let s1 = session();
    let s2 = session();
    app.engine.registry.join(&s1, "lobby").unwrap();
    app.engine.registry.join(&s2, "lobby").unwrap();
    app.engine.registry.leave(s2.id);

    let response = app.get("/lobby.json").await;
    assert_eq!(response.body, json!("1:2"));
}

#[tokio::test]
async fn test_namespace_json_decodes_percent_encoded_name() {
    let app = helpers::TestApp::new();
    let s1 = session();
    app.engine.registry.join(&s1, "café").unwrap();

    let response = app.get("/caf%C3%A9.json").await;
    assert_eq!(response.body, json!("1:1"));

    let response = app.get("/two%20words.json").await;
    assert_eq!(response.body, json!("0:0"));
    assert_eq!(app.engine.registry.namespace_count(), 1);
}

#[tokio::test]
async fn test_stats_json_lists_live_namespaces() {
    let app = helpers::TestApp::new();
    let s1 = session();
    app.engine.registry.join(&s1, "lobby").unwrap();
    app.engine.registry.listen(&s1, &["stage".to_string()]).unwrap();

    let response = app.get("/stats.json").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["lobby"]["members"], json!(1));
    assert_eq!(response.body["lobby"]["connections"], json!(1));
    assert!(response.body["lobby"]["created"].as_i64().unwrap() > 0);
    assert_eq!(response.body["stage"]["members"], json!(0));
}

#[tokio::test]
async fn test_stats_json_empty() {
    let app = helpers::TestApp::new();
    let response = app.get("/stats.json").await;
    assert_eq!(response.body, json!({}));
}

#[tokio::test]
async fn test_jsonp_wrapping() {
    let app = helpers::TestApp::new();

    let response = app.get("/lobby.json?callback=cb").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type, "application/javascript");
    assert_eq!(response.text, r#"cb("0:0")"#);

    let response = app.get("/stats.json?jsonp=handlers.meter").await;
    assert_eq!(response.text, "handlers.meter({})");
}

#[tokio::test]
async fn test_jsonp_rejects_unsafe_callback() {
    let app = helpers::TestApp::new();

    let response = app.get("/lobby.json?callback=alert(1)").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["err"], json!("Invalid callback name"));
}

#[tokio::test]
async fn test_demo_page_substitutes_host_and_path() {
    let app = helpers::TestApp::new();

    let response = app.get("/some/room").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.content_type.starts_with("text/html"));
    assert!(response.text.contains("meter.test/ws"));
    assert!(response.text.contains("/some/room"));
    assert!(!response.text.contains("{hostname}"));
    assert!(!response.text.contains("{pathname}"));
}

#[tokio::test]
async fn test_health_check() {
    let app = helpers::TestApp::new();

    let response = app.get("/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], json!("ok"));
}

#[tokio::test]
async fn test_detailed_health_check() {
    let app = helpers::TestApp::new();
    let s1 = session();
    app.engine.registry.join(&s1, "lobby").unwrap();

    let response = app.get("/health/detailed").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["namespaces"], json!(1));
    assert_eq!(response.body["sessions"], json!(0));
    assert_eq!(response.body["metrics"]["namespaces_created"], json!(1));
}

#[tokio::test]
async fn test_ws_route_requires_upgrade() {
    let app = helpers::TestApp::new();

    let response = app.get("/ws").await;

    assert!(
        response.status.is_client_error(),
        "Expected a 4xx without upgrade headers, got {}",
        response.status
    );
}
