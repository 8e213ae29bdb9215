//! rustls setup.
//!
//! A TLS configuration needs a crypto provider and a set of trusted roots,
//! both picked by cargo features. Without a provider feature the process
//! default installed through `CryptoProvider::install_default()` is used.

use std::sync::Arc;

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use rustls::crypto::CryptoProvider;
use rustls::{ClientConfig, RootCertStore};

use crate::builder::ClientBuildError;

/// Whether this build can make TLS connections without extra setup.
pub const fn has_tls_support() -> bool {
    let provider = cfg!(any(feature = "tls-ring", feature = "tls-aws-lc"));
    let roots = cfg!(any(feature = "tls-native-roots", feature = "tls-webpki-roots"));
    provider && roots
}

/// The TLS configuration used when none is supplied.
pub fn default_tls_config() -> Result<ClientConfig, ClientBuildError> {
    let provider = provider().ok_or_else(|| {
        ClientBuildError::Tls(
            "no crypto provider; enable `tls-ring` or `tls-aws-lc` or install a process default"
                .to_string(),
        )
    })?;
    Ok(ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ClientBuildError::Tls(e.to_string()))?
        .with_root_certificates(roots())
        .with_no_client_auth())
}

/// Connector for both `http` and `https` endpoints.
pub(super) fn https_connector(config: ClientConfig) -> HttpsConnector<HttpConnector> {
    HttpsConnectorBuilder::new()
        .with_tls_config(config)
        .https_or_http()
        .enable_all_versions()
        .build()
}

#[cfg(feature = "tls-ring")]
fn provider() -> Option<Arc<CryptoProvider>> {
    Some(Arc::new(rustls::crypto::ring::default_provider()))
}

#[cfg(all(feature = "tls-aws-lc", not(feature = "tls-ring")))]
fn provider() -> Option<Arc<CryptoProvider>> {
    Some(Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

#[cfg(not(any(feature = "tls-ring", feature = "tls-aws-lc")))]
fn provider() -> Option<Arc<CryptoProvider>> {
    CryptoProvider::get_default().cloned()
}

#[allow(unused_mut)]
fn roots() -> RootCertStore {
    let mut store = RootCertStore::empty();

    #[cfg(feature = "tls-native-roots")]
    {
        let loaded = rustls_native_certs::load_native_certs();
        for err in &loaded.errors {
            tracing::debug!(error = %err, "skipping native certificate");
        }
        store.add_parsable_certificates(loaded.certs);
    }

    #[cfg(all(feature = "tls-webpki-roots", not(feature = "tls-native-roots")))]
    store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    store
}
