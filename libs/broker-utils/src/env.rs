//! Environment-variable configuration loading, shared by both services'
//! startup: parse with validation, fail fast on a malformed value rather
//! than silently falling back (per the "fails fast" boot policy).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("environment variable {name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Read a required environment variable.
pub fn required(name: &'static str) -> Result<String, EnvError> {
    std::env::var(name).map_err(|_| EnvError::Missing(name))
}

/// Read an optional environment variable, falling back to `default`.
pub fn optional(name: &'static str, default: impl Into<String>) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

/// Read and parse an optional environment variable, falling back to
/// `default` when unset and failing when set but unparseable.
pub fn optional_parsed<T>(name: &'static str, default: T) -> Result<T, EnvError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw.parse::<T>().map_err(|e| EnvError::Invalid {
            name,
            value: raw,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Read and parse a required environment variable.
pub fn required_parsed<T>(name: &'static str) -> Result<T, EnvError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = required(name)?;
    raw.parse::<T>().map_err(|e| EnvError::Invalid {
        name,
        value: raw,
        reason: e.to_string(),
    })
}

/// Read an optional duration (e.g. `"30s"`, `"1m"`) environment variable
/// via `humantime`, falling back to `default` when unset.
pub fn optional_duration(name: &'static str, default: Duration) -> Result<Duration, EnvError> {
    match std::env::var(name) {
        Ok(raw) => humantime::parse_duration(&raw).map_err(|e| EnvError::Invalid {
            name,
            value: raw,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_falls_back_when_unset() {
        assert_eq!(optional("BROKER_UTILS_TEST_ABSENT", "fallback"), "fallback");
    }

    #[test]
    fn optional_parsed_falls_back_when_unset() {
        let value: u16 = optional_parsed("BROKER_UTILS_TEST_ABSENT_INT", 8080).unwrap();
        assert_eq!(value, 8080);
    }

    #[test]
    fn optional_parsed_reports_invalid_value() {
        std::env::set_var("BROKER_UTILS_TEST_BAD_INT", "not-a-number");
        let result: Result<u16, EnvError> = optional_parsed("BROKER_UTILS_TEST_BAD_INT", 0);
        assert!(result.is_err());
        std::env::remove_var("BROKER_UTILS_TEST_BAD_INT");
    }

    #[test]
    fn optional_duration_parses_humantime() {
        std::env::set_var("BROKER_UTILS_TEST_DURATION", "45s");
        let value = optional_duration("BROKER_UTILS_TEST_DURATION", Duration::from_secs(1)).unwrap();
        assert_eq!(value, Duration::from_secs(45));
        std::env::remove_var("BROKER_UTILS_TEST_DURATION");
    }

    #[test]
    fn required_reports_missing() {
        let result = required("BROKER_UTILS_TEST_DEFINITELY_ABSENT");
        assert!(matches!(result, Err(EnvError::Missing(_))));
    }
}
