//! HTTP exchange layer for [`HttpClient`](crate::HttpClient).
//!
//! [`HyperTransport`] posts one encoded JSON document and hands back the
//! bytes of the answer. It owns the connection pool, so clones and clients
//! built on the same transport share connections.
//!
//! # Feature Flags
//!
//! - `tls` (default) - Enables `tls-ring` + `tls-webpki-roots`
//! - `tls-ring` / `tls-aws-lc` - Crypto providers
//! - `tls-native-roots` / `tls-webpki-roots` - Root certificates

mod classify;
mod tls;

use std::time::Duration;

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method, Uri};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client as PoolClient;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};

use crate::ClientError;
use crate::builder::ClientBuildError;
use classify::classify_error;

pub use rustls::ClientConfig as TlsClientConfig;
pub use tls::{default_tls_config, has_tls_support};

const APPLICATION_JSON: &str = "application/json";

/// Pooled HTTP/1.1 and HTTP/2 transport over hyper with rustls.
///
/// # Example
///
/// ```ignore
/// use jsonrpc_axum_client::{HttpClient, HyperTransport};
/// use std::time::Duration;
///
/// let transport = HyperTransport::builder()
///     .pool_idle_timeout(Duration::from_secs(30))
///     .build()?;
///
/// // both clients draw from one pool
/// let mainnet = HttpClient::builder("https://mainnet.example.com")
///     .transport(transport.clone())
///     .build()?;
/// let archive = HttpClient::builder("https://archive.example.com")
///     .transport(transport)
///     .build()?;
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    pool: PoolClient<HttpsConnector<HttpConnector>, Full<Bytes>>,
    http2_only: bool,
}

impl HyperTransport {
    /// Create a transport builder.
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::new()
    }

    /// Create a transport with default settings.
    pub fn new() -> Result<Self, ClientBuildError> {
        Self::builder().build()
    }

    /// Whether connections skip HTTP/1.1 and speak HTTP/2 directly.
    pub fn is_http2_only(&self) -> bool {
        self.http2_only
    }

    /// POST `body` as JSON to `uri` and collect the answer.
    ///
    /// `Content-Type` and `Accept` default to `application/json` unless
    /// `headers` sets them. A status outside 2xx is reported as
    /// [`ClientError::InvalidDownstreamHttpStatus`] without reading the body.
    pub async fn post_json(
        &self,
        uri: Uri,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Bytes, ClientError> {
        let mut request = http::Request::new(Full::new(body));
        *request.method_mut() = Method::POST;
        *request.uri_mut() = uri;
        *request.headers_mut() = headers.clone();
        let request_headers = request.headers_mut();
        request_headers
            .entry(CONTENT_TYPE)
            .or_insert(HeaderValue::from_static(APPLICATION_JSON));
        request_headers
            .entry(ACCEPT)
            .or_insert(HeaderValue::from_static(APPLICATION_JSON));

        let response = self.pool.request(request).await.map_err(classify_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::InvalidDownstreamHttpStatus(status.as_u16()));
        }
        let collected = response
            .into_body()
            .collect()
            .await
            .map_err(classify_error)?;
        Ok(collected.to_bytes())
    }
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("http2_only", &self.http2_only)
            .finish_non_exhaustive()
    }
}

/// Builder for [`HyperTransport`].
#[derive(Debug)]
pub struct HyperTransportBuilder {
    tls_config: Option<TlsClientConfig>,
    http2_only: bool,
    pool_idle_timeout: Duration,
    pool_max_idle_per_host: usize,
}

impl Default for HyperTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransportBuilder {
    /// Defaults: 90 second idle timeout, 32 idle connections per host.
    pub fn new() -> Self {
        Self {
            tls_config: None,
            http2_only: false,
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 32,
        }
    }

    /// Use a custom TLS configuration, e.g. private roots or client certificates.
    pub fn tls_config(mut self, config: TlsClientConfig) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Speak HTTP/2 without negotiating from HTTP/1.1.
    pub fn http2_only(mut self, enabled: bool) -> Self {
        self.http2_only = enabled;
        self
    }

    /// How long an idle pooled connection is kept open.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Cap on idle pooled connections per host.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<HyperTransport, ClientBuildError> {
        let tls_config = match self.tls_config {
            Some(config) => config,
            None => default_tls_config()?,
        };

        let mut pool = PoolClient::builder(TokioExecutor::new());
        // idle timeout needs a timer
        pool.pool_timer(TokioTimer::new())
            .pool_idle_timeout(self.pool_idle_timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .http2_only(self.http2_only);

        Ok(HyperTransport {
            pool: pool.build(tls::https_connector(tls_config)),
            http2_only: self.http2_only,
        })
    }
}
