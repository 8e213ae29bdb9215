//! Synchronous request/response client over HTTP.
//!
//! Every call is exactly one HTTP POST carrying one JSON-RPC message. Calls
//! are not pipelined: a call completes when its own exchange does.

use std::borrow::Cow;
use std::time::Duration;

use http::{HeaderMap, Uri};
use jsonrpc_axum_core::{RequestMessage, ResponseMessage};

use crate::builder::{ClientBuildError, HttpClientBuilder};
use crate::client::{BoxFuture, Client};
use crate::transport::HyperTransport;
use crate::{CallOptions, ClientError};

/// A [`Client`] that sends each call as one HTTP POST.
///
/// The outgoing request is validated before anything is sent. Transport
/// failures are classified into [`DownstreamKind`](crate::DownstreamKind)s,
/// non-2xx statuses become
/// [`InvalidDownstreamHttpStatus`](ClientError::InvalidDownstreamHttpStatus),
/// and the decoded response is validated before it is returned.
///
/// # Example
///
/// ```ignore
/// use jsonrpc_axum_client::{CallOptions, Client, HttpClient};
/// use jsonrpc_axum_core::RequestMessage;
///
/// let client = HttpClient::new("http://localhost:8545")?;
/// let request = RequestMessage::new("eth_chainId").with_version("2.0").with_id(&1)?;
/// let chain_id: String = client.call(request, CallOptions::new()).await?.into_result()?;
/// ```
#[derive(Clone, Debug)]
pub struct HttpClient {
    transport: HyperTransport,
    url: Uri,
    headers: HeaderMap,
    default_timeout: Option<Duration>,
}

impl HttpClient {
    /// Create a builder for the endpoint at `url`.
    pub fn builder<S: Into<String>>(url: S) -> HttpClientBuilder {
        HttpClientBuilder::new(url)
    }

    /// Create a client with default settings.
    pub fn new<S: Into<String>>(url: S) -> Result<Self, ClientBuildError> {
        Self::builder(url).build()
    }

    pub(crate) fn from_parts(
        transport: HyperTransport,
        url: Uri,
        headers: HeaderMap,
        default_timeout: Option<Duration>,
    ) -> Self {
        Self {
            transport,
            url,
            headers,
            default_timeout,
        }
    }

    /// Get the endpoint URL.
    pub fn url(&self) -> &Uri {
        &self.url
    }

    async fn send(
        &self,
        request: RequestMessage,
        options: CallOptions,
    ) -> Result<ResponseMessage, ClientError> {
        request.validate().map_err(ClientError::InvalidRequest)?;
        let body = request.to_bytes().map_err(ClientError::InvalidRequest)?;

        let headers = if options.headers.is_empty() {
            Cow::Borrowed(&self.headers)
        } else {
            let mut merged = self.headers.clone();
            for (name, value) in &options.headers {
                merged.insert(name, value.clone());
            }
            Cow::Owned(merged)
        };

        let exchange = self.transport.post_json(self.url.clone(), &headers, body);
        let bytes = match options.expires_at(self.default_timeout) {
            Some(deadline) => tokio::time::timeout_at(deadline, exchange)
                .await
                .map_err(|_| ClientError::timeout())??,
            None => exchange.await?,
        };

        let response = ResponseMessage::from_slice(&bytes)
            .map_err(|e| ClientError::invalid_response(e.message()))?;
        response
            .validate()
            .map_err(|e| ClientError::invalid_response(e.message()))?;
        Ok(response)
    }
}

impl Client for HttpClient {
    fn call<'a>(
        &'a self,
        request: RequestMessage,
        options: CallOptions,
    ) -> BoxFuture<'a, Result<ResponseMessage, ClientError>> {
        Box::pin(async move {
            let method = request.method().to_owned();
            let result = self.send(request, options).await;
            if let Err(err) = &result {
                tracing::debug!(rpc.method = %method, error = %err, "http call failed");
            }
            result
        })
    }
}
