//! Ingress's public HTTP contract: `POST /<ns>/<name>[/]`, `OPTIONS
//! /<ns>/<name>`, `GET /healthz`, `GET /metrics`. Implements the 8-step
//! admission pipeline from §4.2.

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use broker_core::BrokerError;
use broker_core::autotype::DiscoveredType;
use broker_core::config_store::ConfigStore;
use broker_core::event::{self, Mode};
use broker_core::model::NamespacedName;
use broker_core::ttl;
use broker_security::{EventPolicyEngine, InMemoryEventPolicyEngine, ResourceRef, SecurityContext};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/{namespace}/{name}", post(post_broker_event).options(options_broker))
        .route("/{namespace}/{name}/", post(post_broker_event).options(options_broker))
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

/// `Allow: PUT, OPTIONS` mirrors the historical webhook contract this
/// broker interoperates with (producers send `PUT`-style CORS preflights);
/// the data-plane itself only ever accepts `POST`.
fn webhook_cors_headers() -> [(&'static str, &'static str); 3] {
    [
        ("Allow", "PUT, OPTIONS"),
        ("WebHook-Allowed-Origin", "*"),
        ("WebHook-Allowed-Rate", "*"),
    ]
}

async fn options_broker(Path((_namespace, _name)): Path<(String, String)>) -> Response {
    (StatusCode::OK, webhook_cors_headers()).into_response()
}

async fn post_broker_event(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, BrokerError> {
    let broker_key = NamespacedName::new(namespace, name);

    let broker = state
        .config_store
        .get_broker_by_key(&broker_key)
        .ok_or_else(|| BrokerError::NotFound(format!("broker {}/{}", broker_key.namespace, broker_key.name)))?;

    let channel_address = broker
        .channel_address
        .clone()
        .ok_or_else(|| BrokerError::InternalFailure(format!("broker {}/{} has no channel address", broker_key.namespace, broker_key.name)))?;

    let snapshot = state.config_store.request_snapshot();

    let (parsed, mode) = event::decode_request(&headers, body)
        .map_err(|e| BrokerError::MalformedRequest(e.to_string()))?;

    authorize(&state, &snapshot.feature_flags, &headers, &broker_key).await?;

    let mut events = Vec::with_capacity(parsed.len());
    for result in parsed {
        let mut ce = result.map_err(|e| BrokerError::MalformedRequest(e.to_string()))?;
        ttl::default_ttl(&mut ce, state.max_ttl)?;
        ce.extensions.insert(
            ttl::EVENT_ARRIVAL_TIME_ATTRIBUTE.to_owned(),
            broker_core::event::ExtensionValue::Time(now_rfc3339()),
        );
        events.push(ce);
    }

    let uri: Uri = channel_address
        .parse()
        .map_err(|_| BrokerError::InternalFailure(format!("broker channel address is not a valid URI: {channel_address}")))?;

    let mut outbound = match (mode, events.as_slice()) {
        (Mode::Batch, _) => event::encode_batch_request(&uri, &events).map_err(|e| BrokerError::InternalFailure(e.to_string()))?,
        (_, [single]) => event::encode_request(&uri, single, mode).map_err(|e| BrokerError::InternalFailure(e.to_string()))?,
        _ => return Err(BrokerError::MalformedRequest("non-batch request decoded to more than one event".to_owned())),
    };

    propagate_trace_context(&headers, outbound.headers_mut());

    let channel_response = tokio::time::timeout(state.dispatch_timeout, state.http.send(outbound))
        .await
        .map_err(|_| BrokerError::UpstreamTimeout(format!("channel {channel_address} timed out")))?
        .map_err(|e| BrokerError::UpstreamFailure(e.to_string()))?;

    let upstream_status = channel_response.status();
    let remapped = if upstream_status.is_server_error() {
        StatusCode::BAD_GATEWAY
    } else if upstream_status.is_success() {
        StatusCode::ACCEPTED
    } else {
        upstream_status
    };

    if snapshot.feature_flags.event_type_auto_create {
        if let Some(registrar) = &state.autotype {
            for ce in &events {
                registrar.try_enqueue(DiscoveredType {
                    broker: format!("{}/{}", broker_key.namespace, broker_key.name),
                    event_type: ce.event_type.clone(),
                    source: ce.source.clone(),
                });
            }
        }
    }

    Ok((remapped, [("Allow", "PUT, OPTIONS")]).into_response())
}

async fn authorize(state: &AppState, flags: &broker_core::model::FeatureFlags, headers: &HeaderMap, broker_key: &NamespacedName) -> Result<(), BrokerError> {
    if !flags.oidc_authentication {
        return Ok(());
    }

    let jwks = state
        .jwks
        .as_ref()
        .ok_or_else(|| BrokerError::InternalFailure("OIDCAuthentication is enabled but no JWKS validator is configured".to_owned()))?;

    let auth_header = headers.get(axum::http::header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    let claims = jwks.validate_header(auth_header).await.map_err(|e| BrokerError::Unauthorized(e.to_string()))?;

    let policies = state.config_store.get_event_policies_matching(broker_key);
    let engine = InMemoryEventPolicyEngine::new(policies);

    let ctx = SecurityContext::authenticated(claims.sub);
    let target = ResourceRef::broker(broker_key.namespace.clone(), broker_key.name.clone());
    if !engine.allows(&ctx, &target) {
        return Err(BrokerError::Forbidden(format!("caller not permitted to publish to broker {}/{}", broker_key.namespace, broker_key.name)));
    }

    Ok(())
}

fn propagate_trace_context(inbound: &HeaderMap, outbound: &mut HeaderMap) {
    for name in ["traceparent", "tracestate", "x-request-id"] {
        if let Some(value) = inbound.get(name) {
            outbound.insert(
                axum::http::HeaderName::from_static(name),
                HeaderValue::from_bytes(value.as_bytes()).unwrap_or_else(|_| HeaderValue::from_static("")),
            );
        }
    }
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
