//! Request handlers.
//!
//! A [`Handler`] serves one [`RequestMessage`] by writing its response
//! through a [`ResponseWriter`]. Handlers are usually built from async
//! functions:
//!
//! - [`handler_fn`]: the function receives the whole request
//! - [`method_fn`]: the function receives the decoded params; a decode
//!   failure is answered with `InvalidParams` before the function runs
//!
//! Both write `Ok` values as results and `Err` values as error objects, so
//! handler authors never build envelopes or deal with ids.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use jsonrpc_axum_client::BoxFuture;
use jsonrpc_axum_core::{ErrorObject, RequestMessage};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::response::{ResponseWriter, WriteError, write_error, write_result};

/// Serves a request by writing a response.
///
/// A handler may write nothing, which for a notification is the expected
/// outcome.
pub trait Handler: Send + Sync {
    fn serve<'a>(
        &'a self,
        writer: &'a mut dyn ResponseWriter,
        request: RequestMessage,
    ) -> BoxFuture<'a, ()>;
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn serve<'a>(
        &'a self,
        writer: &'a mut dyn ResponseWriter,
        request: RequestMessage,
    ) -> BoxFuture<'a, ()> {
        (**self).serve(writer, request)
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn serve<'a>(
        &'a self,
        writer: &'a mut dyn ResponseWriter,
        request: RequestMessage,
    ) -> BoxFuture<'a, ()> {
        (**self).serve(writer, request)
    }
}

/// Write the outcome of a handler function.
fn write_outcome<T, E>(writer: &mut dyn ResponseWriter, method: &str, outcome: Result<T, E>)
where
    T: Serialize,
    E: Into<ErrorObject>,
{
    let written = match outcome {
        Ok(value) => match write_result(writer, &value) {
            Err(WriteError::Encode(reason)) => {
                write_error(writer, ErrorObject::internal(reason))
            }
            other => other,
        },
        Err(err) => write_error(writer, err),
    };
    if let Err(err) = written {
        tracing::warn!(rpc.method = %method, error = %err, "failed to write response");
    }
}

// ============================================================================
// handler_fn
// ============================================================================

/// A [`Handler`] backed by an async function of the request.
#[derive(Clone)]
pub struct HandlerFn<F> {
    func: F,
}

/// Create a [`Handler`] from an async function of the request.
///
/// # Example
///
/// ```
/// use jsonrpc_axum::handler_fn;
/// use jsonrpc_axum_core::{ErrorObject, RequestMessage};
///
/// let version = handler_fn(|req: RequestMessage| async move {
///     Ok::<_, ErrorObject>(format!("{} via {}", req.method(), req.version()))
/// });
/// ```
pub fn handler_fn<F, Fut, T, E>(func: F) -> HandlerFn<F>
where
    F: Fn(RequestMessage) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Serialize,
    E: Into<ErrorObject>,
{
    HandlerFn { func }
}

impl<F, Fut, T, E> Handler for HandlerFn<F>
where
    F: Fn(RequestMessage) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Serialize,
    E: Into<ErrorObject>,
{
    fn serve<'a>(
        &'a self,
        writer: &'a mut dyn ResponseWriter,
        request: RequestMessage,
    ) -> BoxFuture<'a, ()> {
        let method = request.method().to_owned();
        let fut = (self.func)(request);
        Box::pin(async move {
            let outcome = fut.await;
            write_outcome(writer, &method, outcome);
        })
    }
}

impl<F> std::fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerFn").finish_non_exhaustive()
    }
}

// ============================================================================
// method_fn
// ============================================================================

/// A [`Handler`] backed by an async function of the decoded params.
pub struct MethodFn<F, P> {
    func: F,
    _params: PhantomData<fn(P)>,
}

impl<F: Clone, P> Clone for MethodFn<F, P> {
    fn clone(&self) -> Self {
        Self {
            func: self.func.clone(),
            _params: PhantomData,
        }
    }
}

/// Create a [`Handler`] from an async function of the params.
///
/// Params are decoded into `P`; absent params decode as `null`, so `()` and
/// `Option<_>` accept a request without params.
///
/// # Example
///
/// ```
/// use jsonrpc_axum::method_fn;
/// use jsonrpc_axum_core::ErrorObject;
///
/// let add = method_fn(|(a, b): (u64, u64)| async move {
///     a.checked_add(b).ok_or_else(|| ErrorObject::invalid_params("overflow"))
/// });
/// ```
pub fn method_fn<F, Fut, P, T, E>(func: F) -> MethodFn<F, P>
where
    F: Fn(P) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    P: DeserializeOwned,
    T: Serialize,
    E: Into<ErrorObject>,
{
    MethodFn {
        func,
        _params: PhantomData,
    }
}

impl<F, Fut, P, T, E> Handler for MethodFn<F, P>
where
    F: Fn(P) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    P: DeserializeOwned,
    T: Serialize,
    E: Into<ErrorObject>,
{
    fn serve<'a>(
        &'a self,
        writer: &'a mut dyn ResponseWriter,
        request: RequestMessage,
    ) -> BoxFuture<'a, ()> {
        let method = request.method().to_owned();
        let fut = request.decode_params::<P>().map(|params| (self.func)(params));
        Box::pin(async move {
            match fut {
                Ok(fut) => write_outcome(writer, &method, fut.await),
                Err(err) => write_outcome::<(), _>(writer, &method, Err(err)),
            }
        })
    }
}

impl<F, P> std::fmt::Debug for MethodFn<F, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodFn").finish_non_exhaustive()
    }
}

// ============================================================================
// Method not found
// ============================================================================

/// Answers every request with `MethodNotFound`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MethodNotFound;

impl Handler for MethodNotFound {
    fn serve<'a>(
        &'a self,
        writer: &'a mut dyn ResponseWriter,
        request: RequestMessage,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let method = request.method();
            write_outcome::<(), _>(writer, method, Err(ErrorObject::method_not_found(method)));
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResponseRecorder;
    use jsonrpc_axum_core::Code;

    async fn serve(handler: &dyn Handler, request: RequestMessage) -> ResponseRecorder {
        let mut recorder = ResponseRecorder::new();
        handler.serve(&mut recorder, request).await;
        recorder
    }

    fn request(method: &str, params: &str) -> RequestMessage {
        RequestMessage::from_slice(
            format!(r#"{{"jsonrpc":"2.0","method":"{method}","params":{params},"id":1}}"#)
                .as_bytes(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_handler_fn_result() {
        let handler = handler_fn(|req: RequestMessage| async move {
            Ok::<_, ErrorObject>(req.method().to_uppercase())
        });
        let recorder = serve(&handler, request("ping", "[]")).await;

        let resp = recorder.into_first().unwrap();
        assert_eq!(resp.decode_result::<String>().unwrap(), "PING");
        // bookkeeping is left to the writer chain
        assert!(!resp.has_id());
    }

    #[tokio::test]
    async fn test_handler_fn_error() {
        let handler = handler_fn(|_: RequestMessage| async {
            Err::<(), _>(std::io::Error::other("disk on fire"))
        });
        let recorder = serve(&handler, request("ping", "[]")).await;

        let err = recorder.into_first().unwrap().decode_error().unwrap().unwrap();
        assert_eq!(err.code(), Code::InternalError);
        assert_eq!(err.message(), "disk on fire");
    }

    #[tokio::test]
    async fn test_method_fn_decodes_params() {
        let handler = method_fn(|(a, b): (u64, u64)| async move { Ok::<_, ErrorObject>(a + b) });
        let recorder = serve(&handler, request("add", "[2,3]")).await;

        assert_eq!(
            recorder.into_first().unwrap().decode_result::<u64>().unwrap(),
            5
        );
    }

    #[tokio::test]
    async fn test_method_fn_invalid_params() {
        let handler = method_fn(|(a, b): (u64, u64)| async move { Ok::<_, ErrorObject>(a + b) });
        let recorder = serve(&handler, request("add", r#"["x"]"#)).await;

        let err = recorder.into_first().unwrap().decode_error().unwrap().unwrap();
        assert_eq!(err.code(), Code::InvalidParams);
    }

    #[tokio::test]
    async fn test_method_fn_without_params() {
        let handler = method_fn(|_: ()| async { Ok::<_, ErrorObject>("0x1") });
        let req = RequestMessage::new("eth_chainId").with_version("2.0");
        let recorder = serve(&handler, req).await;

        assert_eq!(
            recorder.into_first().unwrap().decode_result::<String>().unwrap(),
            "0x1"
        );
    }

    #[tokio::test]
    async fn test_method_not_found() {
        let recorder = serve(&MethodNotFound, request("eth_foo", "[]")).await;

        let err = recorder.into_first().unwrap().decode_error().unwrap().unwrap();
        assert_eq!(err.code(), Code::MethodNotFound);
        assert!(err.message().contains("eth_foo"));
    }
}
