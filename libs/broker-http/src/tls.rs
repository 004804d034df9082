//! TLS client configuration: native OS roots plus an optional trust bundle
//! of additional CA certificates supplied by the config store.

use std::sync::{Arc, OnceLock};

use rustls_pki_types::CertificateDer;

static NATIVE_ROOTS_CACHE: OnceLock<Vec<CertificateDer<'static>>> = OnceLock::new();

fn load_native_certs_inner() -> Vec<CertificateDer<'static>> {
    let result = rustls_native_certs::load_native_certs();

    for err in &result.errors {
        tracing::warn!(error = %err, "error loading native root certificate");
    }

    if result.certs.is_empty() {
        tracing::warn!("no native root CA certificates found");
    } else {
        tracing::debug!(count = result.certs.len(), "loaded native root certificates");
    }

    result.certs
}

/// Native root certificates from the OS store, loaded once and cached.
pub fn native_root_certs() -> &'static [CertificateDer<'static>] {
    NATIVE_ROOTS_CACHE.get_or_init(load_native_certs_inner).as_slice()
}

/// Crypto provider shared by every TLS config this crate builds.
pub fn crypto_provider() -> Arc<rustls::crypto::CryptoProvider> {
    rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

/// Parse zero or more PEM-encoded CA certificates from a trust bundle
/// (the broker's list-trust-bundle-config-maps source).
pub fn parse_trust_bundle(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, String> {
    rustls_pemfile::certs(&mut std::io::Cursor::new(pem))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("failed to parse trust bundle PEM: {e}"))
}

/// Build a `rustls::ClientConfig` trusting native OS roots plus any
/// additional trust-bundle certificates.
pub fn client_config(extra_roots: &[CertificateDer<'static>]) -> Result<rustls::ClientConfig, String> {
    let mut root_store = rustls::RootCertStore::empty();

    let native = native_root_certs();
    let (added, ignored) = root_store.add_parsable_certificates(native.iter().cloned());
    if ignored > 0 {
        tracing::warn!(added, ignored, "some native root certificates could not be parsed");
    }

    let (bundle_added, bundle_ignored) = root_store.add_parsable_certificates(extra_roots.iter().cloned());
    if bundle_ignored > 0 {
        tracing::warn!(
            ignored = bundle_ignored,
            "some trust bundle certificates could not be parsed"
        );
    }

    if added == 0 && bundle_added == 0 {
        return Err("no valid root CA certificates available (native store and trust bundle both empty)".to_owned());
    }

    let provider = crypto_provider();

    rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| format!("failed to set TLS protocol versions: {e}"))
        .map(|b| b.with_root_certificates(root_store).with_no_client_auth())
}
