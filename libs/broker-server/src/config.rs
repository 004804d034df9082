use std::net::SocketAddr;
use std::time::Duration;

/// Where to load the server's TLS certificate and private key from, and how
/// often to poll for a change to the backing files.
#[derive(Debug, Clone)]
pub struct TlsMaterialConfig {
    pub cert_path: String,
    pub key_path: String,
    pub reload_poll_interval: Duration,
}

impl TlsMaterialConfig {
    #[must_use]
    pub fn new(cert_path: impl Into<String>, key_path: impl Into<String>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
            reload_poll_interval: Duration::from_secs(30),
        }
    }
}

/// Lifecycle configuration for a [`crate::ServerManager`]: the plaintext
/// bind address, an optional paired TLS bind address and certificate
/// source, and the grace period given to in-flight connections on shutdown.
#[derive(Debug, Clone)]
pub struct ServerManagerConfig {
    pub http_addr: SocketAddr,
    pub https_addr: Option<SocketAddr>,
    pub tls: Option<TlsMaterialConfig>,
    pub drain_grace_period: Duration,
}

impl ServerManagerConfig {
    #[must_use]
    pub fn http_only(http_addr: SocketAddr, drain_grace_period: Duration) -> Self {
        Self {
            http_addr,
            https_addr: None,
            tls: None,
            drain_grace_period,
        }
    }
}
