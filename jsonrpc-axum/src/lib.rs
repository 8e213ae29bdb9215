//! # jsonrpc-axum
//!
//! A JSON-RPC server toolkit built on [Axum](https://github.com/tokio-rs/axum),
//! for gateways that terminate, route and forward JSON-RPC calls.
//!
//! ## Features
//!
//! - **Routing:** [`Router`] dispatches on version and method through nested
//!   scopes, each with its own fallback handler.
//! - **Handlers from async functions:** [`method_fn`] decodes params and
//!   writes results or errors; handler authors never build envelopes.
//! - **Writer chain:** [`WithId`] and [`WithVersion`] fill in response
//!   bookkeeping from the request.
//! - **Forwarding:** [`ForwardHandler`] proxies anything not handled locally
//!   through a [`jsonrpc_axum_client::Client`].
//! - **HTTP surface:** [`JsonRpcService`] turns any handler into an axum
//!   router.
//!
//! ## Example
//!
//! ```rust,no_run
//! use jsonrpc_axum::prelude::*;
//! use jsonrpc_axum_client::HttpClient;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let node = HttpClient::new("http://localhost:8545")?;
//!
//! let router = Router::new()
//!     .version("2.0", |v2| {
//!         v2.method(
//!             "eth_accounts",
//!             method_fn(|_: ()| async { Ok::<_, ErrorObject>(Vec::<String>::new()) }),
//!         )
//!     })
//!     .default_handler(ForwardHandler::new(node));
//!
//! let app: axum::Router = JsonRpcService::new(LoggedHandler::new(router)).into_router();
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

mod forward;
mod handler;
mod limits;
mod middleware;
mod response;
mod router;
mod service;

pub use forward::ForwardHandler;
pub use handler::{Handler, HandlerFn, MethodFn, MethodNotFound, handler_fn, method_fn};
pub use limits::{DEFAULT_MAX_MESSAGE_SIZE, MessageLimits};
pub use middleware::{LoggedHandler, RequestDefaults, with_request_defaults};
pub use response::{
    ResponseRecorder, ResponseWriter, WithId, WithVersion, WriteError, write_error, write_result,
};
pub use router::{Matcher, Route, Router};
pub use service::JsonRpcService;

// Re-export crates handlers commonly need
pub use jsonrpc_axum_core;
pub use serde;
pub use serde_json;

pub mod prelude {
    //! A prelude for `jsonrpc-axum` providing the most common types.
    pub use crate::{
        ForwardHandler, Handler, JsonRpcService, LoggedHandler, Matcher, ResponseWriter, Router,
        handler_fn, method_fn, write_error, write_result,
    };
    pub use jsonrpc_axum_core::{Code, ErrorObject, RequestMessage, ResponseMessage};
}
