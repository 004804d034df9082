//! The cluster token-request mechanism `IdTokenMinter` refreshes through.
//!
//! No real cluster API ships in this repo; this talks to a configured HTTP
//! endpoint as the external collaborator that actually mints tokens.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use broker_auth::errors::AuthError;
use broker_auth::minter::{MintedToken, TokenSource};
use bytes::Bytes;
use http::Request;
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct MintRequest<'a> {
    service_account: &'a str,
    audience: &'a str,
}

#[derive(Deserialize)]
struct MintResponse {
    token: String,
    expires_in_seconds: u64,
}

pub struct HttpTokenSource {
    http: broker_http::Client,
    endpoint: String,
}

impl HttpTokenSource {
    #[must_use]
    pub fn new(http: broker_http::Client, endpoint: impl Into<String>) -> Self {
        Self { http, endpoint: endpoint.into() }
    }
}

#[async_trait]
impl TokenSource for HttpTokenSource {
    async fn mint(&self, service_account: &str, audience: &str) -> Result<MintedToken, AuthError> {
        let body = serde_json::to_vec(&MintRequest { service_account, audience })
            .map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?;

        let req = Request::builder()
            .method(http::Method::POST)
            .uri(&self.endpoint)
            .header("content-type", "application/json")
            .body(Bytes::from(body))
            .map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?;

        let resp = self.http.send(req).await.map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?;
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?
            .to_bytes();

        let parsed: MintResponse = serde_json::from_slice(&body).map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?;

        Ok(MintedToken {
            token: parsed.token,
            expires_at: Instant::now() + Duration::from_secs(parsed.expires_in_seconds),
        })
    }
}
