//! Ingress entry point: admits CloudEvents at a broker's address and
//! forwards them to the broker's channel. See `handler` for the request
//! pipeline and `config` for startup env vars.

use std::sync::Arc;

use broker_auth::JwksValidator;
use broker_core::autotype::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_DEDUP_WINDOW, Registrar};
use broker_core::config_store::{ConfigStore, InMemoryConfigStore};
use broker_core::telemetry::{LoggingConfig, init_logging, install_prometheus_recorder};
use broker_server::{ServerManager, ServerManagerConfig};
use ingress::autotype_sink::LoggingEventTypeSink;
use ingress::config::IngressConfig;
use ingress::handler;
use ingress::state::AppState;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(&LoggingConfig::from_env());

    let config = match IngressConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid ingress configuration, exiting");
            std::process::exit(1);
        }
    };

    tracing::info!(
        pod_name = %config.pod_name,
        http_addr = %config.http_addr,
        max_ttl = config.max_ttl,
        "starting ingress"
    );

    let metrics_handle = install_prometheus_recorder();

    let http = broker_http::Client::new(broker_http::ClientConfig::default(), &[])
        .map_err(|e| anyhow::anyhow!("failed to build outbound HTTP client: {e}"))?;

    let config_store: Arc<dyn ConfigStore> = Arc::new(InMemoryConfigStore::default());

    let jwks = match (std::env::var("OIDC_JWKS_URI"), std::env::var("OIDC_ISSUER"), std::env::var("OIDC_AUDIENCE")) {
        (Ok(jwks_uri), Ok(issuer), Ok(audience)) => Some(Arc::new(JwksValidator::new(jwks_uri, issuer, audience, http.clone()))),
        _ => None,
    };

    let autotype = Some(Registrar::spawn(Arc::new(LoggingEventTypeSink), DEFAULT_CHANNEL_CAPACITY, DEFAULT_DEDUP_WINDOW));

    let state = AppState {
        config_store,
        http,
        jwks,
        autotype,
        max_ttl: config.max_ttl,
        dispatch_timeout: config.dispatch_timeout,
        metrics_handle,
    };

    let router = handler::router(state);

    let server_config = ServerManagerConfig {
        http_addr: config.http_addr,
        https_addr: config.https_addr,
        tls: config.tls,
        drain_grace_period: config.drain_grace_period,
    };
    let manager = ServerManager::new(server_config);

    let cancel = CancellationToken::new();
    let run_cancel = cancel.clone();
    let server = tokio::spawn(async move { manager.run(router, run_cancel).await });

    wait_for_shutdown().await;
    cancel.cancel();

    server.await??;
    Ok(())
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to install SIGTERM handler"),
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
