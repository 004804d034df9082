use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::Request;
use http_body_util::BodyExt;
use jsonwebtoken::{DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::claims::Claims;
use crate::errors::AuthError;

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    n: String,
    e: String,
}

#[derive(Debug, Clone, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

/// JWKS-based bearer token validator.
///
/// Keys are cached by `kid` and refreshed once on a cache miss; this mirrors
/// the refresh-on-demand pattern rather than a background poller, since a
/// key rotation is rare relative to request volume.
pub struct JwksValidator {
    jwks_uri: String,
    expected_issuer: String,
    expected_audience: String,
    http: broker_http::Client,
    keys: Arc<RwLock<HashMap<String, DecodingKey>>>,
}

impl JwksValidator {
    pub fn new(
        jwks_uri: impl Into<String>,
        expected_issuer: impl Into<String>,
        expected_audience: impl Into<String>,
        http: broker_http::Client,
    ) -> Self {
        Self {
            jwks_uri: jwks_uri.into(),
            expected_issuer: expected_issuer.into(),
            expected_audience: expected_audience.into(),
            http,
            keys: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn fetch_keys(&self) -> Result<(), AuthError> {
        let req = Request::builder()
            .method(http::Method::GET)
            .uri(&self.jwks_uri)
            .body(Bytes::new())
            .map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?;

        let resp = self
            .http
            .send(req)
            .await
            .map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?;

        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?
            .to_bytes();

        let jwks: JwksResponse =
            serde_json::from_slice(&body).map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?;

        let mut keys = HashMap::new();
        for jwk in jwks.keys {
            if jwk.kty == "RSA" {
                let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
                    .map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?;
                keys.insert(jwk.kid, key);
            }
        }

        *self.keys.write().await = keys;
        Ok(())
    }

    async fn get_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let keys = self.keys.read().await;
            if let Some(key) = keys.get(kid) {
                return Ok(key.clone());
            }
        }

        self.fetch_keys().await?;

        let keys = self.keys.read().await;
        keys.get(kid)
            .cloned()
            .ok_or_else(|| AuthError::Malformed(format!("unknown key id: {kid}")))
    }

    /// Validate a raw `Authorization: Bearer <token>` header value.
    pub async fn validate_header(&self, header_value: Option<&str>) -> Result<Claims, AuthError> {
        let token = header_value
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or(AuthError::Missing)?;
        self.validate(token).await
    }

    pub async fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::Malformed(e.to_string()))?;
        let kid = header
            .kid
            .clone()
            .ok_or_else(|| AuthError::Malformed("missing kid".to_owned()))?;

        let key = self.get_key(&kid).await?;

        let mut validation = Validation::new(header.alg);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.set_issuer(&[&self.expected_issuer]);

        let data = decode::<Value>(token, &key, &validation).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidIssuer => AuthError::UntrustedIssuer(self.expected_issuer.clone()),
                _ => AuthError::Malformed(e.to_string()),
            }
        })?;

        let v = data.claims;

        let sub = v
            .get("sub")
            .and_then(Value::as_str)
            .ok_or_else(|| AuthError::Malformed("missing sub".to_owned()))?
            .to_owned();
        let iss = v
            .get("iss")
            .and_then(Value::as_str)
            .ok_or_else(|| AuthError::Malformed("missing iss".to_owned()))?
            .to_owned();
        let exp = v
            .get("exp")
            .and_then(Value::as_i64)
            .ok_or_else(|| AuthError::Malformed("missing exp".to_owned()))?;
        let nbf = v.get("nbf").and_then(Value::as_i64);

        let aud = match v.get("aud") {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(arr)) => arr.iter().filter_map(|x| x.as_str().map(str::to_owned)).collect(),
            _ => Vec::new(),
        };

        let claims = Claims {
            sub,
            iss,
            aud,
            exp,
            nbf,
            extras: v.as_object().cloned().unwrap_or_default(),
        };

        if !claims.has_audience(&self.expected_audience) {
            return Err(AuthError::WrongAudience {
                expected: vec![self.expected_audience.clone()],
                actual: claims.aud.clone(),
            });
        }

        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        if !claims.is_valid_yet(now) {
            return Err(AuthError::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_bearer_prefix_is_rejected() {
        let http = broker_http::Client::new(broker_http::ClientConfig::default(), &[]).unwrap();
        let validator = JwksValidator::new("https://issuer.example/jwks.json", "https://issuer.example", "broker-ns", http);
        let result = validator.validate_header(Some("token-without-prefix")).await;
        assert!(matches!(result, Err(AuthError::Missing)));
    }

    #[tokio::test]
    async fn absent_header_is_rejected() {
        let http = broker_http::Client::new(broker_http::ClientConfig::default(), &[]).unwrap();
        let validator = JwksValidator::new("https://issuer.example/jwks.json", "https://issuer.example", "broker-ns", http);
        let result = validator.validate_header(None).await;
        assert!(matches!(result, Err(AuthError::Missing)));
    }
}
