use std::sync::Arc;
use std::time::Duration;

use broker_auth::JwksValidator;
use broker_core::autotype::Registrar;
use broker_core::config_store::ConfigStore;
use metrics_exporter_prometheus::PrometheusHandle;

/// Everything the ingress handler needs, built once at startup and shared
/// (cheap `Arc`/`Clone`) into every request via `axum::extract::State`.
#[derive(Clone)]
pub struct AppState {
    pub config_store: Arc<dyn ConfigStore>,
    pub http: broker_http::Client,
    pub jwks: Option<Arc<JwksValidator>>,
    pub autotype: Option<Registrar>,
    pub max_ttl: i64,
    pub dispatch_timeout: Duration,
    pub metrics_handle: PrometheusHandle,
}
