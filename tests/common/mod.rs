#![allow(dead_code)]

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use concept_api::config::AppConfig;
use concept_api::database::DatabaseManager;

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub api_url: String,
}

impl TestServer {
    /// Serve a fresh in-memory app on an unused port
    pub async fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let mut config = AppConfig::development();
        config.api.enable_request_logging = false;

        let app = concept_api::app::router(&config, DatabaseManager::memory())?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test port")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let base_url = format!("http://127.0.0.1:{}", port);
        let server = Self {
            port,
            api_url: format!("{}{}", base_url, config.api.base_path),
            base_url,
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    /// A client with its own cookie jar, i.e. its own session
    pub fn client(&self) -> Result<Client> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Client {
            http,
            api_url: self.api_url.clone(),
        })
    }
}

pub struct Client {
    http: reqwest::Client,
    api_url: String,
}

impl Client {
    pub async fn call(&self, method: Method, path: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut request = self.http.request(method, format!("{}{}", self.api_url, path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let value = if text.is_empty() { Value::Null } else { serde_json::from_str(&text)? };
        Ok((status, value))
    }

    pub async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.call(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.call(Method::POST, path, Some(body)).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.call(Method::PATCH, path, Some(body)).await
    }

    pub async fn put(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.call(Method::PUT, path, None).await
    }

    pub async fn delete(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.call(Method::DELETE, path, Some(body)).await
    }

    /// Register `username` with password "pw" and log this client in as them
    pub async fn sign_up(&self, username: &str, role: &str) -> Result<Value> {
        let (status, created) = self
            .post("/users", json!({"username": username, "password": "pw", "role": role}))
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "create user failed: {} {}", status, created);
        let (status, body) = self.post("/login", json!({"username": username, "password": "pw"})).await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed: {} {}", status, body);
        Ok(created["user"].clone())
    }
}
