//! `POD_NAME`/`INGRESS_PORT`/`MAX_TTL`/... environment variable loading,
//! validated at startup so a bad value is a fatal boot error (§6 exit codes)
//! rather than a surprise at request time.

use std::net::SocketAddr;
use std::time::Duration;

use broker_server::TlsMaterialConfig;
use broker_utils::env;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] env::EnvError),

    #[error("MAX_TTL must be > 0, got {0}")]
    InvalidMaxTtl(i64),
}

#[derive(Debug, Clone)]
pub struct IngressConfig {
    pub pod_name: String,
    pub container_name: String,
    pub system_namespace: String,
    pub http_addr: SocketAddr,
    pub https_addr: Option<SocketAddr>,
    pub tls: Option<TlsMaterialConfig>,
    pub max_ttl: i64,
    pub drain_grace_period: Duration,
    pub dispatch_timeout: Duration,
}

impl IngressConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let pod_name = env::optional("POD_NAME", "ingress");
        let container_name = env::optional("CONTAINER_NAME", "ingress");
        let system_namespace = env::optional("SYSTEM_NAMESPACE", "knative-eventing");

        let http_port: u16 = env::optional_parsed("INGRESS_PORT", 8080)?;
        let https_port: u16 = env::optional_parsed("INGRESS_PORT_HTTPS", 8443)?;
        let max_ttl: i64 = env::optional_parsed("MAX_TTL", 255)?;
        if max_ttl <= 0 {
            return Err(ConfigError::InvalidMaxTtl(max_ttl));
        }

        let drain_grace_period = env::optional_duration("DRAIN_GRACE_PERIOD", Duration::from_secs(30))?;
        let dispatch_timeout = env::optional_duration("DISPATCH_TIMEOUT", Duration::from_secs(30))?;

        let tls_cert = std::env::var("TLS_CERT_PATH").ok();
        let tls_key = std::env::var("TLS_KEY_PATH").ok();
        let tls = match (tls_cert, tls_key) {
            (Some(cert_path), Some(key_path)) => Some(TlsMaterialConfig::new(cert_path, key_path)),
            _ => None,
        };

        Ok(Self {
            pod_name,
            container_name,
            system_namespace,
            http_addr: SocketAddr::from(([0, 0, 0, 0], http_port)),
            https_addr: tls.is_some().then(|| SocketAddr::from(([0, 0, 0, 0], https_port))),
            tls,
            max_ttl,
            drain_grace_period,
            dispatch_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane_when_env_is_unset() {
        std::env::remove_var("MAX_TTL");
        std::env::remove_var("INGRESS_PORT");
        let config = IngressConfig::from_env().unwrap();
        assert_eq!(config.max_ttl, 255);
        assert_eq!(config.http_addr.port(), 8080);
        assert!(config.tls.is_none());
    }

    #[test]
    fn non_positive_max_ttl_is_rejected() {
        std::env::set_var("MAX_TTL", "0");
        let result = IngressConfig::from_env();
        std::env::remove_var("MAX_TTL");
        assert!(matches!(result, Err(ConfigError::InvalidMaxTtl(0))));
    }
}
