//! Header propagation allow-list, applied symmetrically to the
//! outbound-to-subscriber leg and the inbound-from-subscriber reply leg.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use broker_core::ttl::TTL_ATTRIBUTE;

const CONTENT_TYPE: &str = "content-type";
const EXACT_ALLOW: &[&str] = &["x-request-id", "prefer", "retry-after", "traceparent", "tracestate"];
const PREFIX_ALLOW: &[&str] = &["knative-", "x-b3-"];

/// Copy only the headers this broker's wire contract allows across a hop.
/// `Content-Type` is always dropped (the event codec writes its own) and
/// anything naming the TTL extension is dropped so it never leaks as a
/// plain header outside the event body.
pub fn filter_allowed(source: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in source {
        let lower = name.as_str().to_ascii_lowercase();
        if lower == CONTENT_TYPE || lower.starts_with(TTL_ATTRIBUTE) || lower.starts_with(&format!("ce-{TTL_ATTRIBUTE}")) {
            continue;
        }
        if EXACT_ALLOW.contains(&lower.as_str()) || PREFIX_ALLOW.iter().any(|prefix| lower.starts_with(prefix)) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

/// Set `Prefer: reply` unconditionally, overwriting rather than duplicating
/// any value already present on the outbound request.
pub fn force_prefer_reply(headers: &mut HeaderMap) {
    headers.insert(HeaderName::from_static("prefer"), HeaderValue::from_static("reply"));
}
