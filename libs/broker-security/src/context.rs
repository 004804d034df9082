/// Resource kind an `EventPolicy` can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ResourceKind {
    Broker,
    Trigger,
}

/// A `(kind, namespace, name)` addressable resource, matching the triple
/// policy evaluation is defined against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
}

impl ResourceRef {
    pub fn broker(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Broker,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn trigger(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Trigger,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

/// The verified caller identity a request is evaluated under.
///
/// Built from the validated JWT subject (see `broker-auth`); an anonymous
/// context is only constructed when OIDC authentication is disabled for
/// the target broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityContext {
    subject: Option<String>,
}

impl SecurityContext {
    #[must_use]
    pub fn authenticated(subject: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
        }
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self { subject: None }
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_context_has_no_subject() {
        assert_eq!(SecurityContext::anonymous().subject(), None);
    }

    #[test]
    fn authenticated_context_exposes_subject() {
        let ctx = SecurityContext::authenticated("system:serviceaccount:ns:sender");
        assert_eq!(ctx.subject(), Some("system:serviceaccount:ns:sender"));
    }
}
