//! Snapshot view of brokers, triggers, event policies, feature flags, and
//! trust bundles, standing in for the informer-fed control plane that
//! populates it out of process.
//!
//! Reads never block on network: every snapshot is an `Arc` swapped in by
//! a [`Watcher`] as control-plane deltas arrive, the same read-mostly
//! snapshot-swap approach used for the server's TLS configuration.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use broker_security::EventPolicy;

use crate::model::{Broker, FeatureFlags, NamespacedName, Trigger, TrustBundle};

/// Snapshot pinned into a single request's context at entry, so a
/// feature-flag flip mid-request never produces inconsistent decisions.
#[derive(Clone)]
pub struct RequestSnapshot {
    pub feature_flags: Arc<FeatureFlags>,
    pub trust_bundle: Arc<TrustBundle>,
}

pub trait ConfigStore: Send + Sync {
    fn get_broker_by_key(&self, key: &NamespacedName) -> Option<Broker>;
    fn list_triggers_for_broker(&self, broker: &NamespacedName) -> Vec<Trigger>;
    /// Look up a trigger by its own `(namespace, name)`, independent of
    /// which broker it is attached to — the shape Filter's dispatch path
    /// (`/triggers/<namespace>/<name>/<uid>`) needs.
    fn get_trigger_by_key(&self, key: &NamespacedName) -> Option<Trigger>;
    fn get_event_policies_matching(&self, broker: &NamespacedName) -> Vec<EventPolicy>;
    fn get_feature_flags_snapshot(&self) -> Arc<FeatureFlags>;
    fn list_trust_bundle_config_maps(&self) -> Arc<TrustBundle>;

    fn request_snapshot(&self) -> RequestSnapshot {
        RequestSnapshot {
            feature_flags: self.get_feature_flags_snapshot(),
            trust_bundle: self.list_trust_bundle_config_maps(),
        }
    }
}

#[derive(Default, Clone)]
struct Inner {
    brokers: HashMap<NamespacedName, Broker>,
    triggers_by_broker: HashMap<NamespacedName, Vec<Trigger>>,
    policies_by_broker: HashMap<NamespacedName, Vec<EventPolicy>>,
}

/// In-memory implementation backed by `ArcSwap`, exercised directly by
/// tests and by a [`Watcher`] driving `apply_*_delta` calls; there is no
/// network implementation of the informer bridge in this repo.
pub struct InMemoryConfigStore {
    inner: ArcSwap<Inner>,
    feature_flags: ArcSwap<FeatureFlags>,
    trust_bundle: ArcSwap<TrustBundle>,
}

impl Default for InMemoryConfigStore {
    fn default() -> Self {
        Self {
            inner: ArcSwap::from_pointee(Inner::default()),
            feature_flags: ArcSwap::from_pointee(FeatureFlags::default()),
            trust_bundle: ArcSwap::from_pointee(TrustBundle::default()),
        }
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn get_broker_by_key(&self, key: &NamespacedName) -> Option<Broker> {
        self.inner.load().brokers.get(key).cloned()
    }

    fn list_triggers_for_broker(&self, broker: &NamespacedName) -> Vec<Trigger> {
        self.inner.load().triggers_by_broker.get(broker).cloned().unwrap_or_default()
    }

    fn get_trigger_by_key(&self, key: &NamespacedName) -> Option<Trigger> {
        self.inner.load().triggers_by_broker.values().flatten().find(|t| &t.key == key).cloned()
    }

    fn get_event_policies_matching(&self, broker: &NamespacedName) -> Vec<EventPolicy> {
        self.inner.load().policies_by_broker.get(broker).cloned().unwrap_or_default()
    }

    fn get_feature_flags_snapshot(&self) -> Arc<FeatureFlags> {
        self.feature_flags.load_full()
    }

    fn list_trust_bundle_config_maps(&self) -> Arc<TrustBundle> {
        self.trust_bundle.load_full()
    }
}

impl InMemoryConfigStore {
    pub fn apply_broker_delta(&self, broker: Broker) {
        let mut next = (**self.inner.load()).clone();
        next.brokers.insert(broker.key.clone(), broker);
        self.inner.store(Arc::new(next));
    }

    pub fn apply_trigger_delta(&self, broker: NamespacedName, trigger: Trigger) {
        let mut next = (**self.inner.load()).clone();
        let triggers = next.triggers_by_broker.entry(broker).or_default();
        if let Some(existing) = triggers.iter_mut().find(|t| t.key == trigger.key) {
            *existing = trigger;
        } else {
            triggers.push(trigger);
        }
        self.inner.store(Arc::new(next));
    }

    pub fn apply_policy_delta(&self, broker: NamespacedName, policies: Vec<EventPolicy>) {
        let mut next = (**self.inner.load()).clone();
        next.policies_by_broker.insert(broker, policies);
        self.inner.store(Arc::new(next));
    }

    pub fn apply_feature_flags(&self, flags: FeatureFlags) {
        self.feature_flags.store(Arc::new(flags));
    }

    pub fn apply_trust_bundle(&self, bundle: TrustBundle) {
        self.trust_bundle.store(Arc::new(bundle));
    }
}

/// Models the external push channel a real informer bridge would drive.
/// Exercised by tests; no network implementation ships in this repo.
pub trait Watcher: Send + Sync {
    fn apply_broker_delta(&self, broker: Broker);
    fn apply_trigger_delta(&self, broker: NamespacedName, trigger: Trigger);
    fn apply_policy_delta(&self, broker: NamespacedName, policies: Vec<EventPolicy>);
}

impl Watcher for InMemoryConfigStore {
    fn apply_broker_delta(&self, broker: Broker) {
        InMemoryConfigStore::apply_broker_delta(self, broker);
    }

    fn apply_trigger_delta(&self, broker: NamespacedName, trigger: Trigger) {
        InMemoryConfigStore::apply_trigger_delta(self, broker, trigger);
    }

    fn apply_policy_delta(&self, broker: NamespacedName, policies: Vec<EventPolicy>) {
        InMemoryConfigStore::apply_policy_delta(self, broker, policies);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterSpec;

    fn broker_key() -> NamespacedName {
        NamespacedName::new("ns", "default")
    }

    #[test]
    fn get_broker_by_key_returns_none_when_absent() {
        let store = InMemoryConfigStore::default();
        assert!(store.get_broker_by_key(&broker_key()).is_none());
    }

    #[test]
    fn apply_broker_delta_is_visible_immediately() {
        let store = InMemoryConfigStore::default();
        store.apply_broker_delta(Broker {
            key: broker_key(),
            channel_address: Some("http://channel.internal".to_owned()),
            dead_letter_sink: None,
        });
        let broker = store.get_broker_by_key(&broker_key()).unwrap();
        assert_eq!(broker.channel_address.as_deref(), Some("http://channel.internal"));
    }

    #[test]
    fn apply_trigger_delta_updates_existing_entry_in_place() {
        let store = InMemoryConfigStore::default();
        let trigger = Trigger {
            key: NamespacedName::new("ns", "tg"),
            uid: "uid-1".to_owned(),
            broker_name: "default".to_owned(),
            subscriber_url: Some("http://sub.internal".to_owned()),
            reply_url: None,
            dead_letter_url: None,
            filter: FilterSpec::default(),
            service_account: None,
        };
        store.apply_trigger_delta(broker_key(), trigger.clone());

        let mut updated = trigger;
        updated.subscriber_url = Some("http://sub2.internal".to_owned());
        store.apply_trigger_delta(broker_key(), updated);

        let triggers = store.list_triggers_for_broker(&broker_key());
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].subscriber_url.as_deref(), Some("http://sub2.internal"));
    }

    #[test]
    fn get_trigger_by_key_finds_trigger_regardless_of_broker() {
        let store = InMemoryConfigStore::default();
        let trigger = Trigger {
            key: NamespacedName::new("ns", "tg"),
            uid: "uid-1".to_owned(),
            broker_name: "default".to_owned(),
            subscriber_url: Some("http://sub.internal".to_owned()),
            reply_url: None,
            dead_letter_url: None,
            filter: FilterSpec::default(),
            service_account: None,
        };
        store.apply_trigger_delta(broker_key(), trigger.clone());

        let found = store.get_trigger_by_key(&NamespacedName::new("ns", "tg")).unwrap();
        assert_eq!(found.uid, "uid-1");
        assert!(store.get_trigger_by_key(&NamespacedName::new("ns", "missing")).is_none());
    }

    #[test]
    fn feature_flags_snapshot_is_pinned_until_next_apply() {
        let store = InMemoryConfigStore::default();
        let snapshot = store.get_feature_flags_snapshot();
        assert!(!snapshot.oidc_authentication);

        store.apply_feature_flags(FeatureFlags { oidc_authentication: true, ..FeatureFlags::default() });

        assert!(!snapshot.oidc_authentication);
        assert!(store.get_feature_flags_snapshot().oidc_authentication);
    }
}
