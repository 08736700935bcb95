mod common;

use anyhow::Result;
use common::TestServer;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn health_and_service_info_respond() -> Result<()> {
    let server = TestServer::spawn().await?;
    let http = reqwest::Client::new();

    let health = http.get(format!("{}/health", server.base_url)).send().await?;
    assert_eq!(health.status(), StatusCode::OK);
    let body: serde_json::Value = health.json().await?;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");

    let root: serde_json::Value = http.get(&server.base_url).send().await?.json().await?;
    assert_eq!(root["name"], "concept-api");
    Ok(())
}

#[tokio::test]
async fn session_follows_login_and_logout() -> Result<()> {
    let server = TestServer::spawn().await?;
    let client = server.client()?;

    let (status, body) = client.get("/session").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let user = client.sign_up("alice", "RegularUser").await?;
    assert!(user.get("password").is_none());

    let (status, me) = client.get("/session").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "alice");
    assert_eq!(me["_id"], user["_id"]);

    // Already logged in
    let (status, _) = client.post("/login", json!({"username": "alice", "password": "pw"})).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = client
        .post("/users", json!({"username": "bob", "password": "pw", "role": "RegularUser"}))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = client.post("/logout", json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Logged out!");
    let (status, _) = client.get("/session").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn sessions_are_per_client() -> Result<()> {
    let server = TestServer::spawn().await?;
    let alice = server.client()?;
    let anonymous = server.client()?;

    alice.sign_up("alice", "RegularUser").await?;
    let (status, _) = anonymous.get("/session").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn bad_credentials_and_inputs() -> Result<()> {
    let server = TestServer::spawn().await?;
    let client = server.client()?;
    client.sign_up("alice", "RegularUser").await?;
    client.post("/logout", json!({})).await?;

    let (status, body) = client.post("/login", json!({"username": "alice", "password": "nope"})).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Username or password is incorrect.");

    let (status, body) = client
        .post("/users", json!({"username": "carol", "password": "pw", "role": "Admin"}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["violations"][0]["field"], "role");

    let (status, body) = client.post("/users", json!({"username": "carol"})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["violations"].as_array().map(Vec::len), Some(2));

    let (status, _) = client
        .post("/users", json!({"username": "alice", "password": "x", "role": "RegularUser"}))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn unknown_routes_and_methods() -> Result<()> {
    let server = TestServer::spawn().await?;
    let client = server.client()?;

    let (status, body) = client.get("/nothing/here").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let response = reqwest::Client::new()
        .put(format!("{}/login", server.api_url))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let allow = response.headers().get("allow").and_then(|v| v.to_str().ok()).unwrap_or_default();
    assert!(allow.contains("POST"));
    Ok(())
}

#[tokio::test]
async fn account_updates() -> Result<()> {
    let server = TestServer::spawn().await?;
    let client = server.client()?;
    client.sign_up("alice", "RegularUser").await?;
    server.client()?.sign_up("creator", "ContentCreator").await?;

    let (status, _) = client.patch("/users/username", json!({"username": "creator"})).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = client.patch("/users/username", json!({"username": "alicia"})).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = client
        .patch("/users/password", json!({"currentPassword": "wrong", "newPassword": "next"}))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = client
        .patch("/users/password", json!({"currentPassword": "pw", "newPassword": "next"}))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, creators) = client.get("/contentcreators").await?;
    assert_eq!(creators.as_array().map(Vec::len), Some(1));
    let (status, found) = client.get("/users/alicia").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["role"], "RegularUser");

    let (status, _) = client.delete("/users", json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = client.get("/session").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = client.get("/users/alicia").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
