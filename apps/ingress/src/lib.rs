//! Broker Ingress library surface, split out from `main` so integration
//! tests can drive `handler::router` in-process with `tower::ServiceExt`.

pub mod autotype_sink;
pub mod config;
pub mod handler;
pub mod state;
