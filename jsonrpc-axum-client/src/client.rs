//! The transport client abstraction.
//!
//! A [`Client`] submits one [`RequestMessage`] and obtains one
//! [`ResponseMessage`]. Implementations:
//!
//! - [`HttpClient`](crate::HttpClient): one HTTP POST per call
//! - [`Connection`](crate::Connection): a persistent multiplexed connection
//! - the decorators in [`interceptor`](crate::interceptor), which wrap another client
//!
//! Decorators are stacked with [`ClientExt`]:
//!
//! ```ignore
//! use jsonrpc_axum_client::{ClientExt, HttpClient};
//!
//! let client = HttpClient::builder("http://localhost:8545")
//!     .build()?
//!     .with_id_validation()
//!     .with_default_version("2.0")
//!     .with_incremental_id();
//! ```
//!
//! The outermost decorator runs first on the way out, so in the example ids
//! are assigned before the version is defaulted, and response ids are checked
//! against the request as it left the process.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use jsonrpc_axum_core::{RequestMessage, ResponseMessage};

use crate::interceptor::{DefaultVersion, IncrementalId, ValidateId};
use crate::{CallOptions, ClientError};

/// Type alias for a boxed future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Submit one request, obtain one response.
///
/// A downstream business error is a successful call returning a response with
/// an error member; `Err` is reserved for local validation, transport and
/// protocol failures.
pub trait Client: Send + Sync {
    fn call<'a>(
        &'a self,
        request: RequestMessage,
        options: CallOptions,
    ) -> BoxFuture<'a, Result<ResponseMessage, ClientError>>;
}

impl<C: Client + ?Sized> Client for Arc<C> {
    fn call<'a>(
        &'a self,
        request: RequestMessage,
        options: CallOptions,
    ) -> BoxFuture<'a, Result<ResponseMessage, ClientError>> {
        (**self).call(request, options)
    }
}

impl<C: Client + ?Sized> Client for Box<C> {
    fn call<'a>(
        &'a self,
        request: RequestMessage,
        options: CallOptions,
    ) -> BoxFuture<'a, Result<ResponseMessage, ClientError>> {
        (**self).call(request, options)
    }
}

impl<C: Client + ?Sized> Client for &C {
    fn call<'a>(
        &'a self,
        request: RequestMessage,
        options: CallOptions,
    ) -> BoxFuture<'a, Result<ResponseMessage, ClientError>> {
        (**self).call(request, options)
    }
}

/// A client backed by a closure.
///
/// Useful for tests and for adapting another transport without a new type.
///
/// # Example
///
/// ```
/// use jsonrpc_axum_client::{CallOptions, ClientError, client_fn};
/// use jsonrpc_axum_core::{RequestMessage, ResponseMessage};
///
/// let echo = client_fn(|req: RequestMessage, _opts: CallOptions| async move {
///     let params: serde_json::Value = req.decode_params().map_err(ClientError::InvalidRequest)?;
///     let resp = ResponseMessage::success(&params).map_err(ClientError::InvalidRequest)?;
///     Ok::<_, ClientError>(
///         resp.with_version("2.0")
///             .with_raw_id(req.raw_id().map(ToOwned::to_owned)),
///     )
/// });
/// ```
#[derive(Clone)]
pub struct ClientFn<F> {
    func: F,
}

/// Create a [`Client`] from a closure.
pub fn client_fn<F, Fut>(func: F) -> ClientFn<F>
where
    F: Fn(RequestMessage, CallOptions) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ResponseMessage, ClientError>> + Send + 'static,
{
    ClientFn { func }
}

impl<F, Fut> Client for ClientFn<F>
where
    F: Fn(RequestMessage, CallOptions) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ResponseMessage, ClientError>> + Send + 'static,
{
    fn call<'a>(
        &'a self,
        request: RequestMessage,
        options: CallOptions,
    ) -> BoxFuture<'a, Result<ResponseMessage, ClientError>> {
        Box::pin((self.func)(request, options))
    }
}

impl<F> std::fmt::Debug for ClientFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientFn").finish_non_exhaustive()
    }
}

/// Decorator combinators for every [`Client`].
pub trait ClientExt: Client + Sized {
    /// Assign `"1"`, `"2"`, ... to requests that carry no id.
    fn with_incremental_id(self) -> IncrementalId<Self> {
        IncrementalId::new(self)
    }

    /// Assign `"<base>.1"`, `"<base>.2"`, ... to requests that carry no id.
    fn with_incremental_id_base<S: Into<String>>(self, base: S) -> IncrementalId<Self> {
        IncrementalId::with_base(self, base)
    }

    /// Set `version` on requests whose version is empty.
    fn with_default_version<S: Into<String>>(self, version: S) -> DefaultVersion<Self> {
        DefaultVersion::new(self, version)
    }

    /// Reject responses whose id does not match the request id.
    fn with_id_validation(self) -> ValidateId<Self> {
        ValidateId::new(self)
    }

    /// Erase the concrete client type.
    fn boxed(self) -> Box<dyn Client>
    where
        Self: 'static,
    {
        Box::new(self)
    }
}

impl<C: Client> ClientExt for C {}
