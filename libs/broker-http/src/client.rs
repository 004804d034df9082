use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;
use hyper_util::client::legacy::Client as LegacyClient;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use rustls_pki_types::CertificateDer;

use crate::config::ClientConfig;
use crate::error::HttpError;
use crate::tls;

type HttpsConnector = hyper_rustls::HttpsConnector<HttpConnector>;
type Incoming = hyper::body::Incoming;

/// Shared outbound HTTP client used for both channel forwarding (Ingress)
/// and subscriber dispatch (Filter).
///
/// Built once per process and `Arc`-cloned into every request path; cloning
/// is cheap since the inner hyper client shares its connection pool.
#[derive(Clone)]
pub struct Client {
    inner: Arc<LegacyClient<HttpsConnector, Full<Bytes>>>,
    request_timeout: Duration,
}

impl Client {
    /// Build a client trusting native OS roots plus an optional trust bundle.
    pub fn new(config: ClientConfig, trust_bundle: &[CertificateDer<'static>]) -> Result<Self, HttpError> {
        let tls_config =
            tls::client_config(trust_bundle).map_err(|e| HttpError::Tls(e.into()))?;

        let mut http_connector = HttpConnector::new();
        http_connector.set_connect_timeout(Some(config.connect_timeout));
        http_connector.enforce_http(false);

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .wrap_connector(http_connector);

        let inner = LegacyClient::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build(connector);

        Ok(Self {
            inner: Arc::new(inner),
            request_timeout: config.request_timeout,
        })
    }

    /// Send a fully-formed request and return the upstream response unread.
    ///
    /// Callers read/drop the body themselves (the response may be proxied
    /// straight through, as Filter/Dispatch does for the caller's reply leg).
    pub async fn send(&self, req: Request<Bytes>) -> Result<Response<Incoming>, HttpError> {
        let req = req.map(Full::new);
        match tokio::time::timeout(self.request_timeout, self.inner.request(req)).await {
            Ok(result) => result.map_err(HttpError::from),
            Err(_) => Err(HttpError::Timeout(self.request_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn build_with_defaults_succeeds_or_reports_tls_error() {
        match Client::new(ClientConfig::default(), &[]) {
            Ok(_) => {}
            Err(HttpError::Tls(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}
