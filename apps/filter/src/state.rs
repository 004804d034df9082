use std::sync::Arc;
use std::time::Duration;

use broker_auth::{IdTokenMinter, JwksValidator};
use broker_core::config_store::ConfigStore;
use metrics_exporter_prometheus::PrometheusHandle;

/// Everything the filter/dispatch handler needs, built once at startup and
/// shared (cheap `Arc`/`Clone`) into every request via `axum::extract::State`.
#[derive(Clone)]
pub struct AppState {
    pub config_store: Arc<dyn ConfigStore>,
    pub http: broker_http::Client,
    pub jwks: Option<Arc<JwksValidator>>,
    pub minter: Option<Arc<IdTokenMinter>>,
    pub dispatch_timeout: Duration,
    pub metrics_handle: PrometheusHandle,
}
