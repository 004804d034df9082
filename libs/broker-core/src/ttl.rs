//! Hop-count TTL extension: defaulted on Ingress admission, decremented on
//! every Filter hop, and stripped before an event ever reaches a subscriber.

use crate::error::BrokerError;
use crate::event::{CloudEvent, ExtensionValue};

/// Extension name carrying the broker-internal hop count. Preserved
/// verbatim from the wire protocol this broker interoperates with.
pub const TTL_ATTRIBUTE: &str = "knativebrokerttl";

/// Internal-only extension recording when Ingress first admitted an event.
pub const EVENT_ARRIVAL_TIME_ATTRIBUTE: &str = "knativearrivaltime";

/// Read the TTL extension as an integer, if present and well-typed.
#[must_use]
pub fn get_ttl(event: &CloudEvent) -> Option<i64> {
    match event.extensions.get(TTL_ATTRIBUTE) {
        Some(ExtensionValue::Integer(n)) => Some(*n),
        _ => None,
    }
}

pub fn set_ttl(event: &mut CloudEvent, ttl: i64) {
    event.extensions.insert(TTL_ATTRIBUTE.to_owned(), ExtensionValue::Integer(ttl));
}

pub fn strip_ttl(event: &mut CloudEvent) {
    event.extensions.remove(TTL_ATTRIBUTE);
}

/// Ingress-side defaulting: missing TTL becomes `max_ttl`; a present TTL
/// that is `<= 0` is rejected; anything else passes through unchanged.
pub fn default_ttl(event: &mut CloudEvent, max_ttl: i64) -> Result<(), BrokerError> {
    match get_ttl(event) {
        None => {
            set_ttl(event, max_ttl);
            Ok(())
        }
        Some(n) if n <= 0 => Err(BrokerError::MalformedRequest(format!("non-positive ttl: {n}"))),
        Some(_) => Ok(()),
    }
}

/// Filter-side decrement: absence of TTL is a malformed request; a TTL of
/// `1` or less means this hop is the last one and the event is dropped.
pub enum Decrement {
    Decremented(i64),
    Exhausted,
}

pub fn decrement_ttl(event: &CloudEvent) -> Result<Decrement, BrokerError> {
    match get_ttl(event) {
        None => Err(BrokerError::MalformedRequest("missing ttl extension".to_owned())),
        Some(n) if n <= 1 => Ok(Decrement::Exhausted),
        Some(n) => Ok(Decrement::Decremented(n - 1)),
    }
}
