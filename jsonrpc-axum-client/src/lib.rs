//! JSON-RPC clients for Rust.
//!
//! This crate provides the client side of `jsonrpc-axum`: a [`Client`]
//! abstraction that submits one [`RequestMessage`] and obtains one
//! [`ResponseMessage`], decorators for the bookkeeping every caller repeats,
//! and two transports.
//!
//! ## Features
//!
//! - [`HttpClient`]: one HTTP POST per call, over hyper with rustls
//! - [`Connection`]: a persistent multiplexed connection with out-of-order
//!   responses, correlated by id
//! - Decorators via [`ClientExt`]: id assignment, version defaulting,
//!   response id validation
//! - [`Session`]: per-session id prefixes over one shared connection
//! - [`Method`]: typed method descriptors
//!
//! ## Example
//!
//! ```ignore
//! use jsonrpc_axum_client::{CallOptions, ClientExt, HttpClient, Method};
//! use std::time::Duration;
//!
//! const BLOCK_NUMBER: Method<(), String> = Method::new("eth_blockNumber");
//!
//! let client = HttpClient::builder("http://localhost:8545")
//!     .timeout(Duration::from_secs(10))
//!     .build()?
//!     .with_id_validation()
//!     .with_default_version("2.0")
//!     .with_incremental_id();
//!
//! let block = BLOCK_NUMBER.call(&client, &(), CallOptions::new()).await?;
//! ```
//!
//! ## Multiplexed Example
//!
//! ```ignore
//! use jsonrpc_axum_client::{Connection, ConnectionConfig, Session};
//! use std::sync::Arc;
//!
//! // `frames` yields inbound text frames, `sink` accepts outbound ones,
//! // e.g. the two halves of a websocket.
//! let conn = Arc::new(Connection::new(frames, sink, ConnectionConfig::default()));
//!
//! // one session per inbound client, all sharing the connection
//! let session = Session::new(conn.clone(), "session-7");
//! let block = BLOCK_NUMBER.call(&session, &(), CallOptions::new()).await?;
//!
//! conn.stop().await;
//! ```

mod builder;
mod client;
mod error;
mod http_client;
pub mod interceptor;
mod method;
mod mux;
mod options;
mod session;
pub mod transport;

pub use builder::{ClientBuildError, HttpClientBuilder};
pub use client::{BoxFuture, Client, ClientExt, ClientFn, client_fn};
pub use error::{ClientError, DownstreamKind};
pub use http_client::HttpClient;
pub use method::{CallError, Method};
pub use mux::{Connection, ConnectionConfig};
pub use options::CallOptions;
pub use session::Session;
pub use transport::{HyperTransport, HyperTransportBuilder};

// Re-export core types
pub use jsonrpc_axum_core::{
    Code, DEFAULT_VERSION, ErrorObject, IdKey, RequestMessage, ResponseMessage,
};
