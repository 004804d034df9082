pub mod attribute;
pub mod cesql;
pub mod subscriptions_api;

use crate::event::CloudEvent;

pub use attribute::AttributeFilter;
pub use subscriptions_api::SubscriptionFilter;

/// A trigger's filter specification, carrying both dialects so precedence
/// can be resolved per request against the current trigger generation.
///
/// Decided open question: a non-empty Subscriptions-API list always takes
/// precedence. An *empty* Subscriptions-API list falls through to the
/// attribute filter, even when both are present on the same trigger — the
/// two dialects are never combined.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    pub subscriptions_api: Vec<SubscriptionFilter>,
    pub attributes: AttributeFilter,
}

impl FilterSpec {
    #[must_use]
    pub fn matches(&self, event: &CloudEvent) -> bool {
        if self.subscriptions_api.is_empty() {
            self.attributes.matches(event)
        } else {
            subscriptions_api::matches_all(&self.subscriptions_api, event)
        }
    }
}
