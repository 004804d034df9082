use broker_errors::{Problem, catalog};
use thiserror::Error;

/// The five named bearer-token verification failure modes, each mapping to
/// 401 at the HTTP boundary (see error-handling policy).
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token expired")]
    Expired,

    #[error("wrong audience: expected {expected:?}, got {actual:?}")]
    WrongAudience { expected: Vec<String>, actual: Vec<String> },

    #[error("untrusted issuer: {0}")]
    UntrustedIssuer(String),

    #[error("denied by event policy")]
    Forbidden,

    #[error("jwks fetch failed: {0}")]
    JwksFetchFailed(String),
}

impl AuthError {
    pub fn to_problem(&self) -> Problem {
        match self {
            AuthError::Forbidden => catalog::FORBIDDEN.as_problem(self.to_string()),
            AuthError::JwksFetchFailed(_) => catalog::UPSTREAM_FAILURE.as_problem(self.to_string()),
            _ => catalog::UNAUTHORIZED.as_problem(self.to_string()),
        }
    }
}

#[cfg(feature = "axum-ext")]
impl axum::response::IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        self.to_problem().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_maps_to_403() {
        let p = AuthError::Forbidden.to_problem();
        assert_eq!(p.status, http::StatusCode::FORBIDDEN);
    }

    #[test]
    fn expired_maps_to_401() {
        let p = AuthError::Expired.to_problem();
        assert_eq!(p.status, http::StatusCode::UNAUTHORIZED);
    }
}
