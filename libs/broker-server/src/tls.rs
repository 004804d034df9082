//! Server-side TLS material: load a certificate chain and private key,
//! build a `rustls::ServerConfig`, and poll the backing files for change
//! so a rotated certificate secret is picked up without a restart.
//!
//! Existing connections are unaffected by a reload: they keep the
//! `rustls::ServerConfig` `Arc` that was current when their handshake
//! completed. New connections observe whatever [`TlsState::current`]
//! returns at accept time — the same `ArcSwap`-snapshot approach used
//! elsewhere in the workspace for read-mostly, occasionally-refreshed
//! state, applied here to a server acceptor instead of a request-scoped
//! config read.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};

use crate::config::TlsMaterialConfig;
use crate::error::ServerError;

fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>, ServerError> {
    let bytes = fs::read(path).map_err(|e| ServerError::TlsMaterial(format!("reading cert {path}: {e}")))?;
    rustls_pemfile::certs(&mut bytes.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ServerError::TlsMaterial(format!("parsing cert {path}: {e}")))
}

fn load_key(path: &str) -> Result<PrivateKeyDer<'static>, ServerError> {
    let bytes = fs::read(path).map_err(|e| ServerError::TlsMaterial(format!("reading key {path}: {e}")))?;
    rustls_pemfile::private_key(&mut bytes.as_slice())
        .map_err(|e| ServerError::TlsMaterial(format!("parsing key {path}: {e}")))?
        .ok_or_else(|| ServerError::TlsMaterial(format!("no private key found in {path}")))
}

/// Build a fresh `rustls::ServerConfig` from the certificate and key files
/// named by `material`.
pub fn load_server_config(material: &TlsMaterialConfig) -> Result<rustls::ServerConfig, ServerError> {
    let certs = load_certs(&material.cert_path)?;
    let key = load_key(&material.key_path)?;

    let provider = rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()));

    rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ServerError::TlsMaterial(format!("protocol versions: {e}")))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| ServerError::TlsMaterial(format!("building server config: {e}")))
}

fn file_fingerprint(path: &str) -> Option<(std::time::SystemTime, u64)> {
    let meta = fs::metadata(path).ok()?;
    Some((meta.modified().ok()?, meta.len()))
}

/// Holds the live `rustls::ServerConfig` behind an `ArcSwap` and refreshes
/// it from disk on a timer.
pub struct TlsState {
    current: ArcSwap<rustls::ServerConfig>,
}

impl TlsState {
    #[must_use]
    pub fn new(initial: rustls::ServerConfig) -> Arc<Self> {
        Arc::new(Self {
            current: ArcSwap::from_pointee(initial),
        })
    }

    #[must_use]
    pub fn current(&self) -> Arc<rustls::ServerConfig> {
        self.current.load_full()
    }

    fn store(&self, config: rustls::ServerConfig) {
        self.current.store(Arc::new(config));
    }
}

/// Poll `material`'s cert/key files for a change and reload on detection.
/// A reload failure is logged and the previous config is retained — this
/// task never returns an error.
pub async fn run_reload_loop(state: Arc<TlsState>, material: TlsMaterialConfig, cancel: tokio_util::sync::CancellationToken) {
    let mut last = (
        file_fingerprint(&material.cert_path),
        file_fingerprint(&material.key_path),
    );
    let mut ticker = tokio::time::interval(material.reload_poll_interval);
    ticker.tick().await; // first tick fires immediately; skip it, we already loaded at startup

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let fingerprint = (file_fingerprint(&material.cert_path), file_fingerprint(&material.key_path));
        if fingerprint == last {
            continue;
        }
        last = fingerprint;

        match load_server_config(&material) {
            Ok(config) => {
                tracing::info!(cert = %material.cert_path, "reloaded server TLS certificate");
                state.store(config);
            }
            Err(e) => {
                tracing::error!(error = %e, cert = %material.cert_path, "TLS certificate reload failed, retaining previous config");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn write_self_signed(dir: &std::path::Path) -> (String, String) {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_owned()]).unwrap();
        let cert_path = dir.join("cert.pem");
        let key_path = dir.join("key.pem");
        fs::File::create(&cert_path).unwrap().write_all(cert.cert.pem().as_bytes()).unwrap();
        fs::File::create(&key_path).unwrap().write_all(cert.key_pair.serialize_pem().as_bytes()).unwrap();
        (cert_path.to_string_lossy().into_owned(), key_path.to_string_lossy().into_owned())
    }

    #[test]
    fn loads_valid_self_signed_material() {
        let dir = tempfile_dir();
        let (cert_path, key_path) = write_self_signed(&dir);
        let material = TlsMaterialConfig::new(cert_path, key_path);
        assert!(load_server_config(&material).is_ok());
    }

    #[test]
    fn missing_cert_file_is_an_error() {
        let material = TlsMaterialConfig::new("/nonexistent/cert.pem", "/nonexistent/key.pem");
        assert!(load_server_config(&material).is_err());
    }

    #[tokio::test]
    async fn reload_loop_swaps_config_on_change() {
        let dir = tempfile_dir();
        let (cert_path, key_path) = write_self_signed(&dir);
        let material = TlsMaterialConfig {
            reload_poll_interval: Duration::from_millis(20),
            ..TlsMaterialConfig::new(cert_path.clone(), key_path.clone())
        };

        let initial = load_server_config(&material).unwrap();
        let state = TlsState::new(initial);
        let before = Arc::as_ptr(&state.current());

        let cancel = tokio_util::sync::CancellationToken::new();
        let task = tokio::spawn(run_reload_loop(state.clone(), material.clone(), cancel.clone()));

        // Touch the cert with new content so the fingerprint changes.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let (new_cert_path, new_key_path) = write_self_signed(&dir);
        fs::copy(&new_cert_path, &cert_path).unwrap();
        fs::copy(&new_key_path, &key_path).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        task.await.unwrap();

        let after = Arc::as_ptr(&state.current());
        assert_ne!(before, after);
    }

    fn tempfile_dir() -> std::path::PathBuf {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!("broker-server-tls-test-{}-{n}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }
}
