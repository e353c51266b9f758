//! Shared fixtures for client integration tests

#![allow(dead_code)]

use jobdm_http::{JobdmClient, MemoryTokenStore};
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::MockServer;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("jobdm_http=debug")
        .with_test_writer()
        .try_init();
}

pub fn user_json(id: &str) -> Value {
    json!({
        "_id": id,
        "fullName": "Ada Lovelace",
        "email": "ada@example.com",
        "type": "employee",
        "authStatus": "authorized",
        "profileCompletion": 60,
        "isEmailVerified": true,
        "createdAt": "2024-01-01T00:00:00Z",
        "updatedAt": "2024-01-02T00:00:00Z"
    })
}

pub fn tokens_json(access: &str, refresh: &str) -> Value {
    json!({ "accessToken": access, "refreshToken": refresh, "expiresIn": "15m" })
}

pub fn success(data: Value) -> Value {
    json!({ "success": true, "data": data })
}

/// Client against `server` holding the given token pair
pub fn client_with_tokens(server: &MockServer, access: &str, refresh: &str) -> JobdmClient {
    init_tracing();
    JobdmClient::builder()
        .base_url(server.uri())
        .token_store(Arc::new(MemoryTokenStore::with_tokens(access, refresh)))
        .build()
        .unwrap()
}

/// Client against `server` with no stored tokens
pub fn anonymous_client(server: &MockServer) -> JobdmClient {
    init_tracing();
    JobdmClient::new(server.uri()).unwrap()
}
