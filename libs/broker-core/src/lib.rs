//! CloudEvents codec, TTL handling, filter evaluation, config-store
//! snapshotting, and the auto-type registrar shared by Ingress and
//! Filter/Dispatch.

pub mod autotype;
pub mod config_store;
pub mod error;
pub mod event;
pub mod filter;
pub mod model;
pub mod telemetry;
pub mod ttl;

pub use error::BrokerError;
pub use model::{Broker, FeatureFlags, NamespacedName, TransportEncryption, Trigger, TrustBundle};
