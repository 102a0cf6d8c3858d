//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use serde_json::Value;
use tokio::sync::watch;
use tower::ServiceExt;

use meter_api::state::AppState;
use meter_core::config::AppConfig;
use meter_realtime::MeterEngine;

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Engine behind the router, for direct state inspection
    pub engine: MeterEngine,
    /// Application config
    pub config: Arc<AppConfig>,
}

impl TestApp {
    /// Create a new test application with a fast notifier
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.meter.notify_interval_ms = 50;
        config.meter.cleanup_delay_ms = 200;
        Self::with_config(config)
    }

    /// Create a test application from an explicit config
    pub fn with_config(config: AppConfig) -> Self {
        let config = Arc::new(config);
        let engine = MeterEngine::new(&config.meter);
        let state =
            AppState::new(config.clone(), engine.clone()).expect("Failed to build app state");
        let router = meter_api::build_router(state);

        Self {
            router,
            engine,
            config,
        }
    }

    /// Make a GET request against the router
    pub async fn get(&self, path: &str) -> TestResponse {
        let req = Request::builder()
            .method("GET")
            .uri(path)
            .header("Host", "meter.test")
            .body(Body::empty())
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let content_type = response
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            content_type,
            text,
            body,
        }
    }

    /// Serve the router on an ephemeral port with the notifier running.
    ///
    /// The returned sender stops the notifier when dropped or set.
    pub async fn spawn(&self) -> (SocketAddr, watch::Sender<bool>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.engine.start_notifier(shutdown_rx);

        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("Test server failed");
        });

        (addr, shutdown_tx)
    }

    /// Notifier cadence for this app
    pub fn tick(&self) -> Duration {
        self.config.meter.notify_interval()
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header, empty if absent
    pub content_type: String,
    /// Raw body text
    pub text: String,
    /// Parsed JSON body, `Null` if not JSON
    pub body: Value,
}
