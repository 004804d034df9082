//! Stand-in [`broker_core::autotype::EventTypeSink`] for the control-plane
//! EventType API, which is an external collaborator out of scope for this
//! repo (§1). Logs at info level instead of calling out to a cluster API.

use broker_core::autotype::{DiscoveredType, EventTypeSink};

pub struct LoggingEventTypeSink;

impl EventTypeSink for LoggingEventTypeSink {
    fn ensure_exists(&self, discovered: &DiscoveredType) {
        tracing::info!(
            broker = %discovered.broker,
            event_type = %discovered.event_type,
            source = %discovered.source,
            "would ensure EventType exists (control-plane API not implemented in this repo)"
        );
    }
}
