//! Broker Filter/Dispatch library surface, split out from `main` so
//! integration tests can drive `handler::router` in-process with
//! `tower::ServiceExt`.

pub mod config;
pub mod handler;
pub mod headers;
pub mod state;
pub mod token_source;
