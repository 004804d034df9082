//! Shared outbound HTTP/TLS transport for the broker data plane.
//!
//! Both Ingress (forwarding to the channel) and Filter/Dispatch (delivering
//! to subscribers) send through one [`Client`] built once at startup and
//! `Arc`-cloned into request handlers, so connection pools are shared across
//! every tenant.

mod client;
mod config;
mod error;
pub mod tls;

pub use client::Client;
pub use config::{ClientConfig, DEFAULT_USER_AGENT};
pub use error::HttpError;
