//! Owns the plaintext and TLS listeners and drives their lifecycle: bind,
//! serve, drain-then-abort on cancellation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;

use crate::config::ServerManagerConfig;
use crate::error::ServerError;
use crate::tls::{self, TlsState};

/// Paired HTTP/HTTPS listener lifecycle. The only holder of the listener
/// sockets; `router` is a plain `axum::Router` with no knowledge of TLS or
/// shutdown.
pub struct ServerManager {
    config: ServerManagerConfig,
}

impl ServerManager {
    #[must_use]
    pub fn new(config: ServerManagerConfig) -> Self {
        Self { config }
    }

    /// Bind both listeners and serve `router` until `cancel` fires, then
    /// drain for `drain_grace_period` before forcibly aborting whatever
    /// connections remain. A bind failure is fatal and returned immediately.
    pub async fn run(&self, router: Router, cancel: CancellationToken) -> Result<(), ServerError> {
        let http_listener = TcpListener::bind(self.config.http_addr)
            .await
            .map_err(|e| ServerError::Bind { addr: self.config.http_addr, source: e })?;
        tracing::info!(addr = %self.config.http_addr, "plaintext listener bound");

        let https_setup = match (&self.config.https_addr, &self.config.tls) {
            (Some(addr), Some(material)) => {
                let initial = tls::load_server_config(material)?;
                let listener = TcpListener::bind(*addr)
                    .await
                    .map_err(|e| ServerError::Bind { addr: *addr, source: e })?;
                tracing::info!(addr = %addr, "TLS listener bound");
                Some((listener, TlsState::new(initial), material.clone()))
            }
            _ => None,
        };

        let mut tasks = JoinSet::new();

        tasks.spawn(serve_http(http_listener, router.clone(), cancel.clone(), self.config.drain_grace_period));

        if let Some((listener, tls_state, material)) = https_setup {
            let reload_cancel = cancel.clone();
            let reload_state = tls_state.clone();
            tasks.spawn(async move {
                tls::run_reload_loop(reload_state, material, reload_cancel).await;
                Ok(())
            });
            tasks.spawn(serve_https(listener, tls_state, router, cancel.clone(), self.config.drain_grace_period));
        }

        while let Some(result) = tasks.join_next().await {
            result.map_err(|e| ServerError::TaskPanicked(e.to_string()))??;
        }

        Ok(())
    }
}

async fn serve_http(listener: TcpListener, router: Router, cancel: CancellationToken, drain_grace: Duration) -> Result<(), ServerError> {
    let shutdown = {
        let cancel = cancel.clone();
        async move { cancel.cancelled().await }
    };

    let serve = axum::serve(listener, router).with_graceful_shutdown(shutdown);
    let handle = tokio::spawn(serve);
    let abort = handle.abort_handle();

    cancel.cancelled().await;

    match tokio::time::timeout(drain_grace, handle).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "plaintext server exited with an error"),
        Ok(Err(e)) => tracing::error!(error = %e, "plaintext server task panicked"),
        Err(_) => {
            tracing::warn!("drain grace period elapsed, forcibly aborting plaintext listener");
            abort.abort();
        }
    }

    Ok(())
}

async fn serve_https(
    listener: TcpListener,
    tls_state: Arc<TlsState>,
    router: Router,
    cancel: CancellationToken,
    drain_grace: Duration,
) -> Result<(), ServerError> {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(handle_tls_connection(stream, peer, tls_state.current(), router.clone()));
                    }
                    Err(e) => tracing::warn!(error = %e, "failed to accept TLS connection"),
                }
            }
        }
    }

    let drain = async {
        while connections.join_next().await.is_some() {}
    };
    if tokio::time::timeout(drain_grace, drain).await.is_err() {
        tracing::warn!("drain grace period elapsed, forcibly aborting remaining TLS connections");
        connections.shutdown().await;
    }

    Ok(())
}

async fn handle_tls_connection(stream: TcpStream, peer: SocketAddr, config: Arc<rustls::ServerConfig>, router: Router) {
    let acceptor = TlsAcceptor::from(config);
    let tls_stream = match acceptor.accept(stream).await {
        Ok(s) => s,
        Err(e) => {
            tracing::debug!(%peer, error = %e, "TLS handshake failed");
            return;
        }
    };

    let io = TokioIo::new(tls_stream);
    let service = hyper_util::service::TowerToHyperService::new(router);
    if let Err(e) = auto::Builder::new(TokioExecutor::new())
        .serve_connection_with_upgrades(io, service)
        .await
    {
        tracing::debug!(%peer, error = %e, "connection error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use std::io::Write;
    use std::net::TcpListener as StdTcpListener;

    fn free_addr() -> SocketAddr {
        let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    }

    #[tokio::test]
    async fn http_only_server_serves_and_shuts_down() {
        let addr = free_addr();
        let router = Router::new().route("/healthz", get(|| async { "" }));
        let manager = ServerManager::new(ServerManagerConfig::http_only(addr, Duration::from_secs(1)));
        let cancel = CancellationToken::new();

        let run_cancel = cancel.clone();
        let handle = tokio::spawn(async move { manager.run(router, run_cancel).await });

        tokio::time::sleep(Duration::from_millis(50)).await;

        let resp = reqwest::get(format!("http://{addr}/healthz")).await.unwrap();
        assert_eq!(resp.status(), 200);

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn bind_failure_is_fatal() {
        let addr = free_addr();
        let _blocker = TcpListener::bind(addr).await.unwrap();

        let router = Router::new();
        let manager = ServerManager::new(ServerManagerConfig::http_only(addr, Duration::from_secs(1)));
        let result = manager.run(router, CancellationToken::new()).await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn https_server_serves_over_tls_and_reloads() {
        let dir = std::env::temp_dir().join(format!("broker-server-manager-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_owned()]).unwrap();
        let cert_path = dir.join("cert.pem");
        let key_path = dir.join("key.pem");
        std::fs::File::create(&cert_path).unwrap().write_all(cert.cert.pem().as_bytes()).unwrap();
        std::fs::File::create(&key_path).unwrap().write_all(cert.key_pair.serialize_pem().as_bytes()).unwrap();

        let http_addr = free_addr();
        let https_addr = free_addr();
        let router = Router::new().route("/healthz", get(|| async { "" }));

        let config = ServerManagerConfig {
            http_addr,
            https_addr: Some(https_addr),
            tls: Some(crate::config::TlsMaterialConfig {
                cert_path: cert_path.to_string_lossy().into_owned(),
                key_path: key_path.to_string_lossy().into_owned(),
                reload_poll_interval: Duration::from_secs(60),
            }),
            drain_grace_period: Duration::from_secs(1),
        };
        let manager = ServerManager::new(config);
        let cancel = CancellationToken::new();
        let run_cancel = cancel.clone();
        let handle = tokio::spawn(async move { manager.run(router, run_cancel).await });

        tokio::time::sleep(Duration::from_millis(50)).await;

        let client = reqwest::Client::builder().danger_accept_invalid_certs(true).build().unwrap();
        let resp = client.get(format!("https://{https_addr}/healthz")).send().await.unwrap();
        assert_eq!(resp.status(), 200);

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }
}
