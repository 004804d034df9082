use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use broker_core::config_store::InMemoryConfigStore;
use broker_core::model::{Broker, NamespacedName};
use httpmock::prelude::*;
use ingress::handler;
use ingress::state::AppState;
use tower::ServiceExt;

fn app_state(store: Arc<InMemoryConfigStore>) -> AppState {
    AppState {
        config_store: store,
        http: broker_http::Client::new(broker_http::ClientConfig::default(), &[]).unwrap(),
        jwks: None,
        autotype: None,
        max_ttl: 255,
        dispatch_timeout: Duration::from_secs(5),
        metrics_handle: metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder().handle(),
    }
}

fn seed_broker(store: &InMemoryConfigStore, channel_address: impl Into<String>) -> NamespacedName {
    let key = NamespacedName::new("ns", "default");
    store.apply_broker_delta(Broker {
        key: key.clone(),
        channel_address: Some(channel_address.into()),
        dead_letter_sink: None,
    });
    key
}

#[tokio::test]
async fn defaults_missing_ttl_to_max_and_forwards() {
    let server = MockServer::start_async().await;
    let channel = server
        .mock_async(|when, then| {
            when.method(POST).path("/broker");
            then.status(200);
        })
        .await;

    let store = Arc::new(InMemoryConfigStore::default());
    seed_broker(&store, server.url("/broker"));
    let app = handler::router(app_state(store));

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ns/default")
                .header("ce-specversion", "1.0")
                .header("ce-type", "com.example.a")
                .header("ce-source", "/mycontext")
                .header("ce-id", "1234")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    channel.assert_async().await;
}

#[tokio::test]
async fn trailing_slash_is_accepted() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200);
        })
        .await;

    let store = Arc::new(InMemoryConfigStore::default());
    seed_broker(&store, server.url("/broker"));
    let app = handler::router(app_state(store));

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ns/default/")
                .header("ce-specversion", "1.0")
                .header("ce-type", "com.example.a")
                .header("ce-source", "/mycontext")
                .header("ce-id", "1234")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn unknown_method_is_rejected() {
    let store = Arc::new(InMemoryConfigStore::default());
    seed_broker(&store, "http://channel.invalid/broker");
    let app = handler::router(app_state(store));

    let resp = app
        .oneshot(Request::builder().method("PATCH").uri("/ns/default").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn malformed_event_is_rejected_with_400() {
    let store = Arc::new(InMemoryConfigStore::default());
    seed_broker(&store, "http://channel.invalid/broker");
    let app = handler::router(app_state(store));

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ns/default")
                .header("ce-specversion", "1.0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_broker_is_404() {
    let store = Arc::new(InMemoryConfigStore::default());
    let app = handler::router(app_state(store));

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ns/missing")
                .header("ce-specversion", "1.0")
                .header("ce-type", "com.example.a")
                .header("ce-source", "/mycontext")
                .header("ce-id", "1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn broker_without_channel_address_is_internal_failure() {
    let store = Arc::new(InMemoryConfigStore::default());
    store.apply_broker_delta(Broker {
        key: NamespacedName::new("ns", "default"),
        channel_address: None,
        dead_letter_sink: None,
    });
    let app = handler::router(app_state(store));

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ns/default")
                .header("ce-specversion", "1.0")
                .header("ce-type", "com.example.a")
                .header("ce-source", "/mycontext")
                .header("ce-id", "1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn upstream_server_error_is_remapped_to_bad_gateway() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(500);
        })
        .await;

    let store = Arc::new(InMemoryConfigStore::default());
    seed_broker(&store, server.url("/broker"));
    let app = handler::router(app_state(store));

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ns/default")
                .header("ce-specversion", "1.0")
                .header("ce-type", "com.example.a")
                .header("ce-source", "/mycontext")
                .header("ce-id", "1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn options_returns_webhook_headers() {
    let store = Arc::new(InMemoryConfigStore::default());
    seed_broker(&store, "http://channel.invalid/broker");
    let app = handler::router(app_state(store));

    let resp = app
        .oneshot(Request::builder().method("OPTIONS").uri("/ns/default").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("Allow").unwrap(), "PUT, OPTIONS");
}

#[tokio::test]
async fn healthz_is_no_content() {
    let store = Arc::new(InMemoryConfigStore::default());
    let app = handler::router(app_state(store));

    let resp = app.oneshot(Request::builder().method("GET").uri("/healthz").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}
