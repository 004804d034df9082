//! `FILTER_PORT`/`DRAIN_GRACE_PERIOD`/... environment variable loading, on
//! the same fail-fast boot policy as Ingress's config.

use std::net::SocketAddr;
use std::time::Duration;

use broker_server::TlsMaterialConfig;
use broker_utils::env;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] env::EnvError),
}

#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub pod_name: String,
    pub http_addr: SocketAddr,
    pub https_addr: Option<SocketAddr>,
    pub tls: Option<TlsMaterialConfig>,
    pub drain_grace_period: Duration,
    pub dispatch_timeout: Duration,
    /// Margin subtracted from a minted OIDC ID token's reported lifetime so
    /// it is treated as expired slightly before the issuer actually
    /// invalidates it.
    pub token_expiry_margin: Duration,
}

impl FilterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let pod_name = env::optional("POD_NAME", "filter");

        let http_port: u16 = env::optional_parsed("FILTER_PORT", 8080)?;
        let https_port: u16 = env::optional_parsed("FILTER_PORT_HTTPS", 8443)?;

        let drain_grace_period = env::optional_duration("DRAIN_GRACE_PERIOD", Duration::from_secs(30))?;
        let dispatch_timeout = env::optional_duration("DISPATCH_TIMEOUT", Duration::from_secs(30))?;
        let token_expiry_margin = env::optional_duration("OIDC_TOKEN_EXPIRY_MARGIN", Duration::from_secs(30))?;

        let tls_cert = std::env::var("TLS_CERT_PATH").ok();
        let tls_key = std::env::var("TLS_KEY_PATH").ok();
        let tls = match (tls_cert, tls_key) {
            (Some(cert_path), Some(key_path)) => Some(TlsMaterialConfig::new(cert_path, key_path)),
            _ => None,
        };

        Ok(Self {
            pod_name,
            http_addr: SocketAddr::from(([0, 0, 0, 0], http_port)),
            https_addr: tls.is_some().then(|| SocketAddr::from(([0, 0, 0, 0], https_port))),
            tls,
            drain_grace_period,
            dispatch_timeout,
            token_expiry_margin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane_when_env_is_unset() {
        std::env::remove_var("FILTER_PORT");
        let config = FilterConfig::from_env().unwrap();
        assert_eq!(config.http_addr.port(), 8080);
        assert!(config.tls.is_none());
    }
}
