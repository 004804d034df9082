//! Legacy `{key -> value}` attribute-map filter.

use std::collections::BTreeMap;

use crate::event::CloudEvent;

/// A trigger matches iff every key in the map equals the event's
/// corresponding attribute; `"*"` or an empty string in the map means
/// "match anything" for that key. An empty map matches every event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeFilter {
    pub attributes: BTreeMap<String, String>,
}

impl AttributeFilter {
    #[must_use]
    pub fn matches(&self, event: &CloudEvent) -> bool {
        self.attributes.iter().all(|(key, want)| {
            if want.is_empty() || want == "*" {
                return true;
            }
            event.attribute(key).as_deref() == Some(want.as_str())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> CloudEvent {
        CloudEvent::new("1.0", "com.example.a", "/src", "1")
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(AttributeFilter::default().matches(&event()));
    }

    #[test]
    fn wildcard_value_matches_everything() {
        let mut attributes = BTreeMap::new();
        attributes.insert("type".to_owned(), "*".to_owned());
        assert!(AttributeFilter { attributes }.matches(&event()));
    }

    #[test]
    fn empty_string_value_matches_everything() {
        let mut attributes = BTreeMap::new();
        attributes.insert("type".to_owned(), String::new());
        assert!(AttributeFilter { attributes }.matches(&event()));
    }

    #[test]
    fn exact_match_required_for_named_values() {
        let mut attributes = BTreeMap::new();
        attributes.insert("type".to_owned(), "com.example.a".to_owned());
        assert!(AttributeFilter { attributes }.matches(&event()));
    }

    #[test]
    fn mismatch_rejects() {
        let mut attributes = BTreeMap::new();
        attributes.insert("type".to_owned(), "x".to_owned());
        assert!(!AttributeFilter { attributes }.matches(&event()));
    }
}
