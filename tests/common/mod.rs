//! Shared test harness: spins up the REST server on an OS-assigned port
//! with a throwaway data directory.

// Each test binary compiles its own copy; not every helper is used in both.
#![allow(dead_code)]

use chrono::{Days, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use trackd::{config::TrackerConfig, rest, storage::Storage, AppContext};

pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    _data_dir: TempDir,
}

pub async fn spawn_server() -> TestServer {
    let data_dir = TempDir::new().unwrap();
    let config = Arc::new(TrackerConfig::new(
        Some(0),
        Some(data_dir.path().to_path_buf()),
        Some("error".to_string()),
        None,
    ));
    let storage = Arc::new(Storage::new(data_dir.path()).await.unwrap());
    let ctx = Arc::new(AppContext {
        config,
        storage,
        started_at: std::time::Instant::now(),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = rest::build_router(ctx);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{addr}/api/v1"),
        client: reqwest::Client::new(),
        _data_dir: data_dir,
    }
}

/// A deadline `days` from today, in wire format.
pub fn deadline_in(days: u64) -> String {
    (Utc::now().date_naive() + Days::new(days))
        .format("%Y-%m-%d")
        .to_string()
}

impl TestServer {
    pub async fn get(&self, path: &str) -> (reqwest::StatusCode, Value) {
        let resp = self
            .client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .unwrap();
        let status = resp.status();
        let body = resp.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn post(&self, path: &str, body: Value) -> (reqwest::StatusCode, Value) {
        let resp = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status();
        let body = resp.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn patch(&self, path: &str, body: Value) -> (reqwest::StatusCode, Value) {
        let resp = self
            .client
            .patch(format!("{}{path}", self.base_url))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status();
        let body = resp.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn delete(&self, path: &str) -> reqwest::StatusCode {
        self.client
            .delete(format!("{}{path}", self.base_url))
            .send()
            .await
            .unwrap()
            .status()
    }

    /// Create an employee, asserting success. Returns its id.
    pub async fn employee(&self, full_name: &str, position: &str) -> i64 {
        let (status, body) = self
            .post(
                "/employees",
                json!({ "full_name": full_name, "position": position }),
            )
            .await;
        assert_eq!(status, reqwest::StatusCode::CREATED, "employee create: {body}");
        body["id"].as_i64().unwrap()
    }

    /// Create a task, asserting success. Returns its id.
    pub async fn task(&self, body: Value) -> i64 {
        let (status, body) = self.post("/tasks", body).await;
        assert_eq!(status, reqwest::StatusCode::CREATED, "task create: {body}");
        body["id"].as_i64().unwrap()
    }
}
