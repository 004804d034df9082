use std::collections::BTreeMap;

use bytes::Bytes;

/// Tagged union over the extension value types CloudEvents 1.0 recognizes.
///
/// Structured (JSON) mode carries this type information natively; binary
/// (header) mode has none, so decoding infers it with [`ExtensionValue::infer`].
#[derive(Debug, Clone, PartialEq)]
pub enum ExtensionValue {
    Integer(i64),
    Boolean(bool),
    String(String),
    Uri(String),
    Time(String),
}

impl ExtensionValue {
    /// Infer a type for a raw string value the way binary-mode header
    /// decoding must, since `Ce-*` headers carry no type metadata.
    #[must_use]
    pub fn infer(raw: &str) -> Self {
        if let Ok(n) = raw.parse::<i64>() {
            return ExtensionValue::Integer(n);
        }
        if raw == "true" {
            return ExtensionValue::Boolean(true);
        }
        if raw == "false" {
            return ExtensionValue::Boolean(false);
        }
        if time::OffsetDateTime::parse(raw, &time::format_description::well_known::Rfc3339).is_ok() {
            return ExtensionValue::Time(raw.to_owned());
        }
        if raw.contains("://") {
            return ExtensionValue::Uri(raw.to_owned());
        }
        ExtensionValue::String(raw.to_owned())
    }

    /// Render back to the wire string used in headers and `LIKE`/comparison
    /// evaluation, losing only the type tag.
    #[must_use]
    pub fn as_wire_string(&self) -> String {
        match self {
            ExtensionValue::Integer(n) => n.to_string(),
            ExtensionValue::Boolean(b) => b.to_string(),
            ExtensionValue::String(s) | ExtensionValue::Uri(s) | ExtensionValue::Time(s) => s.clone(),
        }
    }

    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(ExtensionValue::infer(s)),
            serde_json::Value::Bool(b) => Some(ExtensionValue::Boolean(*b)),
            serde_json::Value::Number(n) => n.as_i64().map(ExtensionValue::Integer),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ExtensionValue::Integer(n) => serde_json::Value::from(*n),
            ExtensionValue::Boolean(b) => serde_json::Value::from(*b),
            ExtensionValue::String(s) | ExtensionValue::Uri(s) | ExtensionValue::Time(s) => {
                serde_json::Value::from(s.clone())
            }
        }
    }
}

/// In-memory CloudEvents 1.0 envelope.
///
/// Required attributes are typed fields; everything else (including the
/// broker-internal TTL and arrival-time extensions) lives in `extensions`.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudEvent {
    pub specversion: String,
    pub event_type: String,
    pub source: String,
    pub id: String,
    pub time: Option<String>,
    pub datacontenttype: Option<String>,
    pub subject: Option<String>,
    pub dataschema: Option<String>,
    pub data: Option<Bytes>,
    pub extensions: BTreeMap<String, ExtensionValue>,
}

impl CloudEvent {
    #[must_use]
    pub fn new(specversion: impl Into<String>, event_type: impl Into<String>, source: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            specversion: specversion.into(),
            event_type: event_type.into(),
            source: source.into(),
            id: id.into(),
            time: None,
            datacontenttype: None,
            subject: None,
            dataschema: None,
            data: None,
            extensions: BTreeMap::new(),
        }
    }

    /// Look up a named context attribute or extension as a CloudEvents SQL
    /// comparable string, the way the filter evaluator needs it. Returns
    /// `None` for an attribute this event does not carry (evaluates to SQL
    /// `NULL` upstream).
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<String> {
        match name {
            "specversion" => Some(self.specversion.clone()),
            "type" => Some(self.event_type.clone()),
            "source" => Some(self.source.clone()),
            "id" => Some(self.id.clone()),
            "time" => self.time.clone(),
            "datacontenttype" => self.datacontenttype.clone(),
            "subject" => self.subject.clone(),
            "dataschema" => self.dataschema.clone(),
            other => self.extensions.get(other).map(ExtensionValue::as_wire_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_integer_extension() {
        assert_eq!(ExtensionValue::infer("255"), ExtensionValue::Integer(255));
    }

    #[test]
    fn infers_boolean_extension() {
        assert_eq!(ExtensionValue::infer("true"), ExtensionValue::Boolean(true));
    }

    #[test]
    fn infers_uri_extension() {
        assert_eq!(
            ExtensionValue::infer("https://example.com/a"),
            ExtensionValue::Uri("https://example.com/a".to_owned())
        );
    }

    #[test]
    fn falls_back_to_string_extension() {
        assert_eq!(ExtensionValue::infer("vendor.thing"), ExtensionValue::String("vendor.thing".to_owned()));
    }

    #[test]
    fn attribute_reads_required_fields() {
        let e = CloudEvent::new("1.0", "com.example.a", "/src", "1");
        assert_eq!(e.attribute("type").as_deref(), Some("com.example.a"));
        assert_eq!(e.attribute("time"), None);
    }

    #[test]
    fn attribute_reads_extensions() {
        let mut e = CloudEvent::new("1.0", "com.example.a", "/src", "1");
        e.extensions.insert("knativebrokerttl".to_owned(), ExtensionValue::Integer(5));
        assert_eq!(e.attribute("knativebrokerttl").as_deref(), Some("5"));
        assert_eq!(e.attribute("missing"), None);
    }
}
