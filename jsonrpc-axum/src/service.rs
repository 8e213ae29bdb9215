//! HTTP surface: serve a [`Handler`] as an axum router.
//!
//! Each HTTP POST carries one JSON-RPC request and gets back at most one
//! response:
//!
//! | Inbound | HTTP response |
//! |---------|---------------|
//! | body over the size limit | `413 Payload Too Large` |
//! | malformed JSON | `200`, `ParseError` response with `"id":null` |
//! | envelope failing validation | `200`, `InvalidRequest` response |
//! | handled request | `200`, the handler's response with the request id and version |
//! | notification | `204 No Content`, whatever the handler wrote |
//! | request with id, nothing written | `200`, `InternalError` response |

use std::error::Error as StdError;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use http_body_util::LengthLimitError;
use jsonrpc_axum_core::{DEFAULT_VERSION, ErrorObject, RequestMessage, ResponseMessage, validate_id};
use serde_json::value::RawValue;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handler::Handler;
use crate::limits::MessageLimits;
use crate::middleware::{RequestDefaults, with_request_defaults};
use crate::response::ResponseRecorder;

/// Serves a [`Handler`], typically a [`Router`](crate::Router), over HTTP.
///
/// # Example
///
/// ```rust,no_run
/// use jsonrpc_axum::{ForwardHandler, JsonRpcService, MessageLimits, Router};
/// use jsonrpc_axum_client::HttpClient;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let node = HttpClient::new("http://localhost:8545")?;
/// let router = Router::new().default_handler(ForwardHandler::new(node));
///
/// let app: axum::Router = JsonRpcService::new(router)
///     .path("/rpc")
///     .limits(MessageLimits::new(1024 * 1024))
///     .into_router();
///
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub struct JsonRpcService {
    handler: Arc<dyn Handler>,
    path: String,
    limits: MessageLimits,
}

impl JsonRpcService {
    /// Serve `handler` at `/` with the default limits.
    pub fn new<H: Handler + 'static>(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            path: "/".to_string(),
            limits: MessageLimits::default(),
        }
    }

    /// Set the path to serve on.
    pub fn path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = path.into();
        self
    }

    /// Set the request size limits.
    pub fn limits(mut self, limits: MessageLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Build the axum router.
    ///
    /// The result merges into an application router like any other.
    pub fn into_router<S>(self) -> axum::Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let endpoint = Arc::new(Endpoint {
            handler: with_request_defaults(self.handler),
            limits: self.limits,
        });
        let route = post(move |req: Request| {
            let endpoint = endpoint.clone();
            async move { endpoint.serve(req).await }
        });

        let router = axum::Router::new().route(&self.path, route);
        match self.limits.max_message_size() {
            Some(max) => router.layer(RequestBodyLimitLayer::new(max)),
            None => router,
        }
    }
}

impl std::fmt::Debug for JsonRpcService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcService")
            .field("path", &self.path)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

struct Endpoint {
    handler: RequestDefaults<Arc<dyn Handler>>,
    limits: MessageLimits,
}

impl Endpoint {
    async fn serve(&self, req: Request) -> Response {
        let max = self.limits.max_message_size().unwrap_or(usize::MAX);
        let body = match axum::body::to_bytes(req.into_body(), max).await {
            Ok(body) => body,
            Err(err) if exceeds_limit(&err) => {
                return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
            }
            Err(err) => {
                tracing::debug!(error = %err, "failed to read request body");
                return (StatusCode::BAD_REQUEST, "failed to read request body").into_response();
            }
        };

        let request = match RequestMessage::from_slice(&body) {
            Ok(request) => request,
            Err(err) => {
                tracing::debug!(error = %err, "malformed request body");
                return json(
                    ResponseMessage::failure(err)
                        .with_version(DEFAULT_VERSION)
                        .with_null_id(),
                );
            }
        };

        let version = match request.version() {
            "" => DEFAULT_VERSION.to_owned(),
            v => v.to_owned(),
        };
        let id = reply_id(&request);

        if let Err(err) = request.validate() {
            tracing::debug!(error = %err, "invalid request envelope");
            return json(
                ResponseMessage::failure(err)
                    .with_version(version)
                    .with_raw_id(id.or_else(null_id)),
            );
        }

        let notification = !request.has_id();
        let mut recorder = ResponseRecorder::single();
        self.handler.serve(&mut recorder, request).await;

        if notification {
            return StatusCode::NO_CONTENT.into_response();
        }
        match recorder.into_first() {
            Some(response) => json(response),
            None => json(
                ResponseMessage::failure(ErrorObject::internal("handler wrote no response"))
                    .with_version(version)
                    .with_raw_id(id),
            ),
        }
    }
}

/// The id to answer with: the request id if it is a valid one.
fn reply_id(request: &RequestMessage) -> Option<Box<RawValue>> {
    let raw = request.raw_id()?;
    validate_id(Some(raw)).ok()?;
    Some(raw.to_owned())
}

fn null_id() -> Option<Box<RawValue>> {
    RawValue::from_string("null".to_string()).ok()
}

fn exceeds_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(cause) = source {
        if cause.is::<LengthLimitError>() {
            return true;
        }
        source = cause.source();
    }
    false
}

fn json(response: ResponseMessage) -> Response {
    match response.to_vec() {
        Ok(body) => {
            let mut resp = Response::new(Body::from(body));
            resp.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            resp
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to encode response");
            (StatusCode::INTERNAL_SERVER_ERROR, err.message().to_owned()).into_response()
        }
    }
}
