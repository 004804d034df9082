//! Data-plane view of brokers, triggers, feature flags, and trust bundles.
//!
//! These types mirror what the config store would materialize from the
//! control plane; the store itself is modeled in [`crate::config_store`].

use std::collections::BTreeMap;

use crate::filter::FilterSpec;

/// `(namespace, name)` identity shared by brokers and triggers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Broker {
    pub key: NamespacedName,
    /// Internal URL the Ingress forwards accepted events to.
    pub channel_address: Option<String>,
    pub dead_letter_sink: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Trigger {
    pub key: NamespacedName,
    pub uid: String,
    pub broker_name: String,
    pub subscriber_url: Option<String>,
    pub reply_url: Option<String>,
    pub dead_letter_url: Option<String>,
    pub filter: FilterSpec,
    /// OIDC service-account identity used to mint tokens for dispatch.
    pub service_account: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEncryption {
    Disabled,
    Permissive,
    Strict,
}

/// Dynamic feature flags, swapped atomically as a whole snapshot by the
/// config store so a single request never observes a half-updated set.
#[derive(Debug, Clone)]
pub struct FeatureFlags {
    pub oidc_authentication: bool,
    pub transport_encryption: TransportEncryption,
    pub event_type_auto_create: bool,
    pub cross_namespace_event_links: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            oidc_authentication: false,
            transport_encryption: TransportEncryption::Disabled,
            event_type_auto_create: false,
            cross_namespace_event_links: false,
        }
    }
}

/// Aggregated CA certificates sourced from labelled config maps, rebuilt
/// wholesale and swapped atomically by the config store.
#[derive(Debug, Clone, Default)]
pub struct TrustBundle {
    pub pem_by_config_map: BTreeMap<String, Vec<u8>>,
}

impl TrustBundle {
    #[must_use]
    pub fn concatenated_pem(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for pem in self.pem_by_config_map.values() {
            out.extend_from_slice(pem);
            out.push(b'\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trust_bundle_concatenates_in_key_order() {
        let mut bundle = TrustBundle::default();
        bundle.pem_by_config_map.insert("b".to_owned(), b"B".to_vec());
        bundle.pem_by_config_map.insert("a".to_owned(), b"A".to_vec());
        assert_eq!(bundle.concatenated_pem(), b"A\nB\n");
    }
}
