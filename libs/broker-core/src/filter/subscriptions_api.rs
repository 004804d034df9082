//! Subscriptions-API filter dialect: `exact`, `prefix`, `suffix`, `all`,
//! `any`, `not`, and `cesql`, composed as a tree.

use crate::event::CloudEvent;
use crate::filter::cesql;

#[derive(Debug, Clone)]
pub enum SubscriptionFilter {
    Exact { attribute: String, value: String },
    Prefix { attribute: String, value: String },
    Suffix { attribute: String, value: String },
    All(Vec<SubscriptionFilter>),
    Any(Vec<SubscriptionFilter>),
    Not(Box<SubscriptionFilter>),
    /// Raw `cesql` expression text, parsed on evaluation. A parse failure
    /// evaluates to `false` rather than propagating an error, keeping the
    /// overall filter tree total.
    CeSql(String),
}

impl SubscriptionFilter {
    #[must_use]
    pub fn matches(&self, event: &CloudEvent) -> bool {
        match self {
            SubscriptionFilter::Exact { attribute, value } => event.attribute(attribute).as_deref() == Some(value.as_str()),
            SubscriptionFilter::Prefix { attribute, value } => {
                event.attribute(attribute).is_some_and(|actual| actual.starts_with(value.as_str()))
            }
            SubscriptionFilter::Suffix { attribute, value } => {
                event.attribute(attribute).is_some_and(|actual| actual.ends_with(value.as_str()))
            }
            SubscriptionFilter::All(children) => children.iter().all(|c| c.matches(event)),
            SubscriptionFilter::Any(children) => children.iter().any(|c| c.matches(event)),
            SubscriptionFilter::Not(inner) => !inner.matches(event),
            SubscriptionFilter::CeSql(expr) => cesql::parse(expr).is_ok_and(|node| node.eval(event)),
        }
    }
}

/// A trigger's Subscriptions-API filter list; entries are implicitly ANDed,
/// mirroring a top-level `all`. An empty list carries no preference and the
/// caller falls through to the legacy attribute filter.
#[must_use]
pub fn matches_all(filters: &[SubscriptionFilter], event: &CloudEvent) -> bool {
    filters.iter().all(|f| f.matches(event))
}
