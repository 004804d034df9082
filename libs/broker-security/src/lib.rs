//! EventPolicy authorization for the broker data plane.

pub mod context;
pub mod policy;
pub mod policy_engine;

pub use context::{ResourceKind, ResourceRef, SecurityContext};
pub use policy::EventPolicy;
pub use policy_engine::{EventPolicyEngine, EventPolicyEngineRef, InMemoryEventPolicyEngine, NoopEventPolicyEngine};
