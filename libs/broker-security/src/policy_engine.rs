use std::sync::Arc;

use crate::context::{ResourceRef, SecurityContext};
use crate::policy::EventPolicy;

pub type EventPolicyEngineRef = Arc<dyn EventPolicyEngine>;

/// Evaluates EventPolicy authorization for a verified caller against a
/// target resource. Default posture is deny: a target with no policy
/// naming it is rejected even when other policies exist.
pub trait EventPolicyEngine: Send + Sync {
    fn allows(&self, ctx: &SecurityContext, target: &ResourceRef) -> bool;
}

/// In-memory snapshot of the policies relevant to one request, pinned at
/// request entry the same way the feature-flag snapshot is (see
/// `broker-core::config_store`).
pub struct InMemoryEventPolicyEngine {
    policies: Vec<EventPolicy>,
}

impl InMemoryEventPolicyEngine {
    #[must_use]
    pub fn new(policies: Vec<EventPolicy>) -> Self {
        Self { policies }
    }
}

impl EventPolicyEngine for InMemoryEventPolicyEngine {
    fn allows(&self, ctx: &SecurityContext, target: &ResourceRef) -> bool {
        let Some(subject) = ctx.subject() else {
            return false;
        };
        self.policies.iter().any(|p| p.grants(subject, target))
    }
}

/// Engine used when OIDC authentication is disabled for a broker: every
/// request is anonymous and policy evaluation does not apply.
pub struct NoopEventPolicyEngine;

impl EventPolicyEngine for NoopEventPolicyEngine {
    fn allows(&self, _ctx: &SecurityContext, _target: &ResourceRef) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denies_by_default_when_no_policy_names_target() {
        let engine = InMemoryEventPolicyEngine::new(vec![]);
        let ctx = SecurityContext::authenticated("system:serviceaccount:ns:sender");
        let target = ResourceRef::broker("ns", "default");
        assert!(!engine.allows(&ctx, &target));
    }

    #[test]
    fn denies_anonymous_context_even_with_matching_policy() {
        let engine = InMemoryEventPolicyEngine::new(vec![EventPolicy {
            name: "p".to_owned(),
            from: vec!["*".to_owned()],
            to: vec![ResourceRef::broker("ns", "default")],
        }]);
        let target = ResourceRef::broker("ns", "default");
        assert!(!engine.allows(&SecurityContext::anonymous(), &target));
    }

    #[test]
    fn allows_when_explicit_policy_matches() {
        let engine = InMemoryEventPolicyEngine::new(vec![EventPolicy {
            name: "p".to_owned(),
            from: vec!["system:serviceaccount:ns:sender".to_owned()],
            to: vec![ResourceRef::broker("ns", "default")],
        }]);
        let ctx = SecurityContext::authenticated("system:serviceaccount:ns:sender");
        let target = ResourceRef::broker("ns", "default");
        assert!(engine.allows(&ctx, &target));
    }

    #[test]
    fn noop_engine_always_allows() {
        let ctx = SecurityContext::anonymous();
        let target = ResourceRef::broker("ns", "default");
        assert!(NoopEventPolicyEngine.allows(&ctx, &target));
    }
}
