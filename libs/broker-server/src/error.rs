use thiserror::Error;

/// Failures from the server manager. A bind failure is fatal and returned
/// to the caller immediately; everything else is either a startup TLS
/// configuration error or a panic recovered from a server task. A failed
/// TLS reload is logged and the previous configuration is retained — it
/// never surfaces as a `ServerError`.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load TLS material: {0}")]
    TlsMaterial(String),

    #[error("server task panicked: {0}")]
    TaskPanicked(String),
}
