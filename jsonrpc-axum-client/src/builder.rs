//! Builder for the HTTP client.
//!
//! Provides a fluent API for configuring and building an [`HttpClient`].

use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue, Uri};

use crate::http_client::HttpClient;
use crate::transport::HyperTransport;

/// Builder for creating an [`HttpClient`].
///
/// # Example
///
/// ```ignore
/// use jsonrpc_axum_client::HttpClientBuilder;
/// use std::time::Duration;
///
/// let client = HttpClientBuilder::new("http://localhost:8545")
///     .timeout(Duration::from_secs(10))
///     .header("authorization", "Bearer token123")
///     .build()?;
/// ```
pub struct HttpClientBuilder {
    url: String,
    transport: Option<HyperTransport>,
    default_timeout: Option<Duration>,
    headers: Vec<(String, String)>,
}

impl std::fmt::Debug for HttpClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClientBuilder")
            .field("url", &self.url)
            .field("transport", &self.transport.is_some())
            .field("default_timeout", &self.default_timeout)
            .field("headers", &self.headers.len())
            .finish()
    }
}

impl HttpClientBuilder {
    /// Create a new builder for the endpoint at `url`.
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            transport: None,
            default_timeout: None,
            headers: Vec::new(),
        }
    }

    /// Use a pre-configured transport.
    ///
    /// Share one transport between clients to share its connection pool.
    pub fn transport(mut self, transport: HyperTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the default timeout for calls that set neither a timeout nor a deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Add a header sent with every call.
    ///
    /// Invalid names or values are reported by [`build`](Self::build).
    pub fn header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<HttpClient, ClientBuildError> {
        let url: Uri = self
            .url
            .parse()
            .map_err(|e| ClientBuildError::InvalidUrl(format!("{}: {}", self.url, e)))?;
        match url.scheme_str() {
            Some("http") | Some("https") => {}
            _ => {
                return Err(ClientBuildError::InvalidUrl(format!(
                    "{}: scheme must be http or https",
                    self.url
                )));
            }
        }

        let mut headers = HeaderMap::new();
        for (name, value) in self.headers {
            let header_name = HeaderName::try_from(name.as_str())
                .map_err(|_| ClientBuildError::InvalidHeader(name.clone()))?;
            let header_value = HeaderValue::try_from(value.as_str())
                .map_err(|_| ClientBuildError::InvalidHeader(name.clone()))?;
            headers.append(header_name, header_value);
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => HyperTransport::new()?,
        };

        Ok(HttpClient::from_parts(
            transport,
            url,
            headers,
            self.default_timeout,
        ))
    }
}

/// Error building a client or transport.
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    /// The endpoint URL is invalid.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// A configured header name or value is invalid.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// TLS could not be configured.
    #[error("failed to configure TLS: {0}")]
    Tls(String),
}
