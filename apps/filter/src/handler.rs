//! Filter/Dispatch's public HTTP contract: `POST
//! /triggers/<namespace>/<name>/<uid>`, `GET /healthz`, `GET /metrics`.
//! Implements the pipeline and state machine from §4.3.

use std::time::Instant;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use broker_core::BrokerError;
use broker_core::event;
use broker_core::model::{NamespacedName, Trigger};
use broker_core::telemetry::metric_names;
use broker_core::ttl::{self, Decrement};
use broker_security::{EventPolicyEngine, InMemoryEventPolicyEngine, ResourceRef, SecurityContext};
use http_body_util::BodyExt;

use crate::headers;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/triggers/{namespace}/{name}/{uid}", post(dispatch))
        .fallback(unmatched_path)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

async fn unmatched_path() -> Response {
    BrokerError::MalformedRequest("unrecognized path shape for the filter/dispatch contract".to_owned()).into_response()
}

async fn dispatch(
    State(state): State<AppState>,
    Path((namespace, name, uid)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let response = run_dispatch(&state, &namespace, &name, &uid, &headers, body).await;
    metrics::histogram!(metric_names::PROCESS_DURATION).record(started.elapsed().as_secs_f64());
    response.unwrap_or_else(IntoResponse::into_response)
}

async fn run_dispatch(
    state: &AppState,
    namespace: &str,
    name: &str,
    uid: &str,
    inbound_headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, BrokerError> {
    let trigger_key = NamespacedName::new(namespace, name);

    let trigger = state
        .config_store
        .get_trigger_by_key(&trigger_key)
        .filter(|t| t.uid == uid)
        .ok_or_else(|| BrokerError::NotFound(format!("trigger {namespace}/{name} (uid {uid})")))?;

    let subscriber_url = trigger
        .subscriber_url
        .clone()
        .ok_or_else(|| BrokerError::NotFound(format!("trigger {namespace}/{name} has no subscriber")))?;

    let (parsed, mode) = event::decode_request(inbound_headers, body).map_err(|e| BrokerError::MalformedRequest(e.to_string()))?;
    if parsed.len() != 1 {
        return Err(BrokerError::MalformedRequest("filter dispatch expects exactly one event per request".to_owned()));
    }
    let mut ce = parsed.into_iter().next().unwrap().map_err(|e| BrokerError::MalformedRequest(e.to_string()))?;

    let remaining_ttl = match ttl::decrement_ttl(&ce)? {
        Decrement::Exhausted => return Ok(StatusCode::OK.into_response()),
        Decrement::Decremented(n) => n,
    };

    let broker_key = NamespacedName::new(trigger_key.namespace.clone(), trigger.broker_name.clone());
    let snapshot = state.config_store.request_snapshot();
    authorize(state, &snapshot.feature_flags, &broker_key, &trigger_key, inbound_headers).await?;

    if !trigger.filter.matches(&ce) {
        return Ok(StatusCode::OK.into_response());
    }

    ttl::strip_ttl(&mut ce);

    let uri: Uri = subscriber_url
        .parse()
        .map_err(|_| BrokerError::InternalFailure(format!("trigger subscriber url is not a valid URI: {subscriber_url}")))?;
    let mut outbound = event::encode_request(&uri, &ce, mode).map_err(|e| BrokerError::InternalFailure(e.to_string()))?;

    for (name, value) in headers::filter_allowed(inbound_headers).iter() {
        outbound.headers_mut().append(name.clone(), value.clone());
    }
    headers::force_prefer_reply(outbound.headers_mut());

    if let Some(service_account) = &trigger.service_account {
        if let Some(minter) = &state.minter {
            let token = minter.mint(service_account, &subscriber_url).await.map_err(|e| BrokerError::Unauthorized(e.to_string()))?;
            outbound
                .headers_mut()
                .insert(axum::http::header::AUTHORIZATION, format!("Bearer {token}").parse().map_err(|_| {
                    BrokerError::InternalFailure("minted token is not a valid header value".to_owned())
                })?);
        }
    }

    let dispatch_started = Instant::now();
    let subscriber_response = tokio::time::timeout(state.dispatch_timeout, state.http.send(outbound))
        .await
        .map_err(|_| BrokerError::UpstreamTimeout(format!("subscriber {subscriber_url} timed out")))?
        .map_err(|e| BrokerError::UpstreamFailure(e.to_string()))?;
    metrics::histogram!(metric_names::DISPATCH_DURATION).record(dispatch_started.elapsed().as_secs_f64());

    handle_subscriber_response(state, &trigger, &ce, mode, remaining_ttl, subscriber_response).await
}

async fn authorize(
    state: &AppState,
    flags: &broker_core::model::FeatureFlags,
    broker_key: &NamespacedName,
    trigger_key: &NamespacedName,
    inbound_headers: &HeaderMap,
) -> Result<(), BrokerError> {
    if !flags.oidc_authentication {
        return Ok(());
    }

    let jwks = state
        .jwks
        .as_ref()
        .ok_or_else(|| BrokerError::InternalFailure("OIDCAuthentication is enabled but no JWKS validator is configured".to_owned()))?;

    let auth_header = inbound_headers.get(axum::http::header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    let claims = jwks.validate_header(auth_header).await.map_err(|e| BrokerError::Unauthorized(e.to_string()))?;
    let ctx = SecurityContext::authenticated(claims.sub);

    let policies = state.config_store.get_event_policies_matching(broker_key);
    let engine = InMemoryEventPolicyEngine::new(policies);

    let target = ResourceRef::trigger(trigger_key.namespace.clone(), trigger_key.name.clone());
    if !engine.allows(&ctx, &target) {
        return Err(BrokerError::Forbidden(format!("caller not permitted to dispatch to trigger {}/{}", trigger_key.namespace, trigger_key.name)));
    }

    Ok(())
}

async fn handle_subscriber_response(
    state: &AppState,
    trigger: &Trigger,
    ce: &event::CloudEvent,
    mode: event::Mode,
    remaining_ttl: i64,
    subscriber_response: http::Response<hyper::body::Incoming>,
) -> Result<Response, BrokerError> {
    let status = subscriber_response.status();
    let response_headers = subscriber_response.headers().clone();
    let body = subscriber_response
        .into_body()
        .collect()
        .await
        .map_err(|e| BrokerError::UpstreamFailure(e.to_string()))?
        .to_bytes();

    if status.is_success() {
        if body.is_empty() {
            return Ok((status, headers::filter_allowed(&response_headers)).into_response());
        }

        let (parsed, mode) = match event::decode_request(&response_headers, body) {
            Ok(result) => result,
            Err(_) => return Err(BrokerError::UpstreamFailure("subscriber reply is not a valid CloudEvent".to_owned())),
        };
        if parsed.len() != 1 {
            return Err(BrokerError::UpstreamFailure("subscriber reply batch is not supported".to_owned()));
        }
        let mut reply = parsed
            .into_iter()
            .next()
            .unwrap()
            .map_err(|_| BrokerError::UpstreamFailure("subscriber reply is not a valid CloudEvent".to_owned()))?;

        ttl::set_ttl(&mut reply, remaining_ttl);

        let broker_key = NamespacedName::new(trigger.key.namespace.clone(), trigger.broker_name.clone());
        let broker = state
            .config_store
            .get_broker_by_key(&broker_key)
            .ok_or_else(|| BrokerError::InternalFailure(format!("broker {}/{} has no config", broker_key.namespace, broker_key.name)))?;
        let channel_address = broker
            .channel_address
            .ok_or_else(|| BrokerError::InternalFailure(format!("broker {}/{} has no channel address", broker_key.namespace, broker_key.name)))?;
        let channel_uri: Uri = channel_address
            .parse()
            .map_err(|_| BrokerError::InternalFailure(format!("broker channel address is not a valid URI: {channel_address}")))?;
        let channel_req = event::encode_request(&channel_uri, &reply, mode).map_err(|e| BrokerError::InternalFailure(e.to_string()))?;

        let channel_response = state.http.send(channel_req).await.map_err(|e| BrokerError::UpstreamFailure(e.to_string()))?;
        return Ok(channel_response.status().into_response());
    }

    if let Some(dead_letter_url) = &trigger.dead_letter_url {
        let dl_uri: Uri = dead_letter_url
            .parse()
            .map_err(|_| BrokerError::InternalFailure(format!("trigger dead-letter url is not a valid URI: {dead_letter_url}")))?;
        let dl_req = event::encode_request(&dl_uri, ce, mode).map_err(|e| BrokerError::InternalFailure(e.to_string()))?;
        let dl_response = state.http.send(dl_req).await.map_err(|e| BrokerError::UpstreamFailure(e.to_string()))?;
        let dl_status = dl_response.status();
        let dl_headers = dl_response.headers().clone();
        return Ok((dl_status, headers::filter_allowed(&dl_headers)).into_response());
    }

    Ok((status, headers::filter_allowed(&response_headers)).into_response())
}
