use broker_errors::{Problem, catalog};
use thiserror::Error;

/// Error kinds named in the error-handling design, each mapping to one
/// status code and a short, actionable log line that never carries event
/// payloads.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    #[error("upstream timeout: {0}")]
    UpstreamTimeout(String),

    #[error("internal failure: {0}")]
    InternalFailure(String),
}

impl axum::response::IntoResponse for BrokerError {
    fn into_response(self) -> axum::response::Response {
        self.to_problem().into_response()
    }
}

impl BrokerError {
    #[must_use]
    pub fn to_problem(&self) -> Problem {
        match self {
            BrokerError::MalformedRequest(_) => catalog::MALFORMED_REQUEST.as_problem(self.to_string()),
            BrokerError::Unauthorized(_) => catalog::UNAUTHORIZED.as_problem(self.to_string()),
            BrokerError::Forbidden(_) => catalog::FORBIDDEN.as_problem(self.to_string()),
            BrokerError::NotFound(_) => catalog::NOT_FOUND.as_problem(self.to_string()),
            BrokerError::MethodNotAllowed => catalog::METHOD_NOT_ALLOWED.as_problem(self.to_string()),
            BrokerError::UpstreamFailure(_) => catalog::UPSTREAM_FAILURE.as_problem(self.to_string()),
            BrokerError::UpstreamTimeout(_) => catalog::UPSTREAM_TIMEOUT.as_problem(self.to_string()),
            BrokerError::InternalFailure(_) => catalog::INTERNAL_FAILURE.as_problem(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_request_maps_to_400() {
        let p = BrokerError::MalformedRequest("bad event".to_owned()).to_problem();
        assert_eq!(p.status, http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_failure_maps_to_502() {
        let p = BrokerError::UpstreamFailure("channel unreachable".to_owned()).to_problem();
        assert_eq!(p.status, http::StatusCode::BAD_GATEWAY);
    }
}
