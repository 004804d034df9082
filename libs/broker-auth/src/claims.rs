use serde::{Deserialize, Serialize};

/// Provider-agnostic JWT claims, normalized from whatever shape the
/// issuer's token actually carries (string or array `aud`, etc).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub aud: Vec<String>,
    pub exp: i64,
    pub nbf: Option<i64>,
    #[serde(flatten)]
    pub extras: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    #[must_use]
    pub fn is_expired(&self, now_unix: i64) -> bool {
        now_unix >= self.exp
    }

    #[must_use]
    pub fn is_valid_yet(&self, now_unix: i64) -> bool {
        self.nbf.is_none_or(|nbf| now_unix >= nbf)
    }

    #[must_use]
    pub fn has_audience(&self, audience: &str) -> bool {
        self.aud.iter().any(|a| a == audience)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> Claims {
        Claims {
            sub: "system:serviceaccount:ns:sender".to_owned(),
            iss: "https://issuer.example".to_owned(),
            aud: vec!["broker-ns".to_owned()],
            exp: 1000,
            nbf: Some(500),
            extras: serde_json::Map::new(),
        }
    }

    #[test]
    fn expiry_check() {
        let c = claims();
        assert!(!c.is_expired(999));
        assert!(c.is_expired(1000));
    }

    #[test]
    fn nbf_check() {
        let c = claims();
        assert!(!c.is_valid_yet(499));
        assert!(c.is_valid_yet(500));
    }

    #[test]
    fn audience_check() {
        let c = claims();
        assert!(c.has_audience("broker-ns"));
        assert!(!c.has_audience("other"));
    }
}
