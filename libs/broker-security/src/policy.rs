use crate::context::ResourceRef;

/// Declarative allow-list tying a set of caller identities (`from`) to a
/// set of target resources (`to`). A policy grants access when the caller's
/// subject appears in `from` and the target resource matches any entry in
/// `to`; namespace/name of `"*"` matches any value in that position.
#[derive(Debug, Clone)]
pub struct EventPolicy {
    pub name: String,
    pub from: Vec<String>,
    pub to: Vec<ResourceRef>,
}

impl EventPolicy {
    fn matches_subject(&self, subject: &str) -> bool {
        self.from.iter().any(|s| s == "*" || s == subject)
    }

    fn matches_resource(&self, target: &ResourceRef) -> bool {
        self.to.iter().any(|r| {
            r.kind == target.kind
                && (r.namespace == "*" || r.namespace == target.namespace)
                && (r.name == "*" || r.name == target.name)
        })
    }

    /// Whether this policy, on its own, grants `subject` access to `target`.
    #[must_use]
    pub fn grants(&self, subject: &str, target: &ResourceRef) -> bool {
        self.matches_subject(subject) && self.matches_resource(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ResourceKind;

    fn policy() -> EventPolicy {
        EventPolicy {
            name: "allow-sender".to_owned(),
            from: vec!["system:serviceaccount:ns:sender".to_owned()],
            to: vec![ResourceRef::broker("ns", "default")],
        }
    }

    #[test]
    fn grants_when_subject_and_resource_match() {
        let target = ResourceRef::broker("ns", "default");
        assert!(policy().grants("system:serviceaccount:ns:sender", &target));
    }

    #[test]
    fn denies_unmatched_subject() {
        let target = ResourceRef::broker("ns", "default");
        assert!(!policy().grants("system:serviceaccount:ns:other", &target));
    }

    #[test]
    fn denies_unmatched_resource() {
        let target = ResourceRef::broker("ns", "other-broker");
        assert!(!policy().grants("system:serviceaccount:ns:sender", &target));
    }

    #[test]
    fn wildcard_subject_and_resource_match_anything() {
        let wild = EventPolicy {
            name: "wildcard".to_owned(),
            from: vec!["*".to_owned()],
            to: vec![ResourceRef {
                kind: ResourceKind::Trigger,
                namespace: "*".to_owned(),
                name: "*".to_owned(),
            }],
        };
        let target = ResourceRef::trigger("any-ns", "any-trigger");
        assert!(wild.grants("anyone", &target));
    }
}
