//! Client decorators.
//!
//! Each decorator wraps another [`Client`] and adds one cross-cutting
//! behavior without changing the contract:
//!
//! - [`IncrementalId`]: assign ids to requests that carry none
//! - [`DefaultVersion`]: fill in an empty version
//! - [`ValidateId`]: reject responses whose id does not match the request
//!
//! Decorators never mutate shared state other than the id counter; each call
//! owns its request, so concurrent callers sharing one decorated client never
//! observe each other's changes.
//!
//! # Example
//!
//! ```
//! use jsonrpc_axum_client::{CallOptions, Client, ClientError, ClientExt, client_fn};
//! use jsonrpc_axum_core::{RequestMessage, ResponseMessage};
//!
//! # tokio_test(async {
//! let node = client_fn(|req: RequestMessage, _: CallOptions| async move {
//!     let resp = ResponseMessage::success(&true).map_err(ClientError::InvalidRequest)?;
//!     Ok::<_, ClientError>(resp.with_version("2.0").with_raw_id(req.raw_id().map(ToOwned::to_owned)))
//! });
//! let client = node.with_id_validation().with_default_version("2.0").with_incremental_id();
//!
//! let resp = client.call(RequestMessage::new("net_listening"), CallOptions::new()).await?;
//! assert_eq!(resp.raw_id().unwrap().get(), r#""1""#);
//! # Ok::<(), ClientError>(())
//! # }).unwrap();
//! # fn tokio_test<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use jsonrpc_axum_core::{RequestMessage, ResponseMessage};
use serde::de::IgnoredAny;
use serde_json::value::RawValue;

use crate::client::{BoxFuture, Client};
use crate::{CallOptions, ClientError};

// ============================================================================
// Id assignment
// ============================================================================

/// Assigns a fresh id to every request that carries none.
///
/// Ids are JSON strings drawn from a strictly increasing counter starting at
/// 1. With a base the id is `"<base>.<n>"`, so several id sequences can share
/// one connection without colliding.
#[derive(Debug)]
pub struct IncrementalId<C> {
    inner: C,
    base: Option<String>,
    counter: AtomicU64,
}

impl<C> IncrementalId<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            base: None,
            counter: AtomicU64::new(0),
        }
    }

    pub fn with_base<S: Into<String>>(inner: C, base: S) -> Self {
        Self {
            inner,
            base: Some(base.into()),
            counter: AtomicU64::new(0),
        }
    }

    /// Get a reference to the wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        match &self.base {
            Some(base) => format!("{}.{}", base, n),
            None => n.to_string(),
        }
    }
}

impl<C: Client> Client for IncrementalId<C> {
    fn call<'a>(
        &'a self,
        mut request: RequestMessage,
        options: CallOptions,
    ) -> BoxFuture<'a, Result<ResponseMessage, ClientError>> {
        if !request.has_id() {
            let id = self.next_id();
            match serde_json::value::to_raw_value(&id) {
                Ok(raw) => request.set_raw_id(Some(raw)),
                Err(e) => {
                    return Box::pin(async move {
                        Err(ClientError::InvalidRequest(e.into()))
                    });
                }
            }
        }
        self.inner.call(request, options)
    }
}

// ============================================================================
// Version default
// ============================================================================

/// Sets a default version on requests whose version is empty.
#[derive(Debug, Clone)]
pub struct DefaultVersion<C> {
    inner: C,
    version: String,
}

impl<C> DefaultVersion<C> {
    pub fn new<S: Into<String>>(inner: C, version: S) -> Self {
        Self {
            inner,
            version: version.into(),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: Client> Client for DefaultVersion<C> {
    fn call<'a>(
        &'a self,
        mut request: RequestMessage,
        options: CallOptions,
    ) -> BoxFuture<'a, Result<ResponseMessage, ClientError>> {
        if request.version().is_empty() {
            request.set_version(self.version.clone());
        }
        self.inner.call(request, options)
    }
}

// ============================================================================
// Response id validation
// ============================================================================

/// Checks that every response id matches its request id.
///
/// Ids are compared by kind and value, so `1` and `"1"` do not match, and
/// numbers are compared exactly however large they are.
/// Notifications (requests without an id) are not checked.
#[derive(Debug, Clone)]
pub struct ValidateId<C> {
    inner: C,
}

impl<C> ValidateId<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: Client> Client for ValidateId<C> {
    fn call<'a>(
        &'a self,
        request: RequestMessage,
        options: CallOptions,
    ) -> BoxFuture<'a, Result<ResponseMessage, ClientError>> {
        let expected = request.raw_id().map(ToOwned::to_owned);
        Box::pin(async move {
            let response = self.inner.call(request, options).await?;
            if let Some(expected) = expected {
                check_id(&expected, response.raw_id())?;
            }
            Ok(response)
        })
    }
}

fn check_id(expected: &RawValue, got: Option<&RawValue>) -> Result<(), ClientError> {
    let Some(got) = got else {
        return Err(ClientError::invalid_response(format!(
            "response is missing id, expected {}",
            expected.get()
        )));
    };
    let want = IdValue::decode(expected)
        .map_err(|e| ClientError::invalid_response(format!("invalid request id: {}", e)))?;
    let have = IdValue::decode(got)
        .map_err(|e| ClientError::invalid_response(format!("invalid response id: {}", e)))?;
    if want != have {
        return Err(ClientError::invalid_response(format!(
            "response id {} does not match request id {}",
            got.get(),
            expected.get()
        )));
    }
    Ok(())
}

/// An id decoded without going through floating point.
///
/// Strings compare by their decoded text, so escapes do not matter. Anything
/// else compares by its literal text, so `1` and `1.0` are different ids.
#[derive(Debug, PartialEq, Eq)]
enum IdValue {
    Null,
    Str(String),
    Literal(String),
}

impl IdValue {
    fn decode(raw: &RawValue) -> Result<Self, serde_json::Error> {
        let text = raw.get().trim();
        match text.as_bytes().first() {
            Some(b'"') => serde_json::from_str(text).map(IdValue::Str),
            Some(b'n') => serde_json::from_str::<()>(text).map(|()| IdValue::Null),
            _ => serde_json::from_str::<IgnoredAny>(text)
                .map(|_| IdValue::Literal(text.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientExt, client_fn};
    use jsonrpc_axum_core::Code;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    /// A node that answers with the request id and records every request seen.
    fn recording_node() -> (impl Client + 'static, Arc<Mutex<Vec<RequestMessage>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let node = client_fn(move |req: RequestMessage, _: CallOptions| {
            sink.lock().unwrap().push(req.clone());
            async move {
                let resp = ResponseMessage::success(&"ok").map_err(ClientError::InvalidRequest)?;
                Ok::<_, ClientError>(
                    resp.with_version("2.0")
                        .with_raw_id(req.raw_id().map(ToOwned::to_owned)),
                )
            }
        });
        (node, seen)
    }

    /// A node that always answers with the given raw id.
    fn fixed_id_node(id: &'static str) -> impl Client + 'static {
        client_fn(move |_: RequestMessage, _: CallOptions| async move {
            let resp = ResponseMessage::success(&"ok").map_err(ClientError::InvalidRequest)?;
            Ok::<_, ClientError>(
                resp.with_version("2.0")
                    .with_raw_id(Some(RawValue::from_string(id.to_owned()).unwrap())),
            )
        })
    }

    #[tokio::test]
    async fn test_incremental_id_sequence() {
        let (node, seen) = recording_node();
        let client = node.with_incremental_id();

        for _ in 0..2 {
            client
                .call(RequestMessage::new("m"), CallOptions::new())
                .await
                .unwrap();
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].raw_id().unwrap().get(), r#""1""#);
        assert_eq!(seen[1].raw_id().unwrap().get(), r#""2""#);
    }

    #[tokio::test]
    async fn test_incremental_id_with_base() {
        let (node, seen) = recording_node();
        let client = node.with_incremental_id_base("base");

        client
            .call(RequestMessage::new("m"), CallOptions::new())
            .await
            .unwrap();
        client
            .call(RequestMessage::new("m"), CallOptions::new())
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].raw_id().unwrap().get(), r#""base.1""#);
        assert_eq!(seen[1].raw_id().unwrap().get(), r#""base.2""#);
    }

    #[tokio::test]
    async fn test_incremental_id_keeps_caller_id() {
        let (node, seen) = recording_node();
        let client = node.with_incremental_id();

        let req = RequestMessage::new("m").with_id(&42).unwrap();
        client.call(req, CallOptions::new()).await.unwrap();

        assert_eq!(seen.lock().unwrap()[0].raw_id().unwrap().get(), "42");
    }

    #[tokio::test]
    async fn test_incremental_id_unique_under_concurrency() {
        let (node, seen) = recording_node();
        let client = Arc::new(node.with_incremental_id());

        let mut tasks = Vec::new();
        for _ in 0..64 {
            let client = client.clone();
            tasks.push(tokio::spawn(async move {
                client
                    .call(RequestMessage::new("m"), CallOptions::new())
                    .await
                    .unwrap()
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let ids: HashSet<String> = seen
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.raw_id().unwrap().get().to_owned())
            .collect();
        assert_eq!(ids.len(), 64);
    }

    #[tokio::test]
    async fn test_default_version() {
        let (node, seen) = recording_node();
        let client = node.with_default_version("2.0");

        client
            .call(RequestMessage::new("m"), CallOptions::new())
            .await
            .unwrap();
        client
            .call(RequestMessage::new("m").with_version("1.0"), CallOptions::new())
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].version(), "2.0");
        assert_eq!(seen[1].version(), "1.0");
    }

    #[tokio::test]
    async fn test_validate_id_accepts_matching_id() {
        let client = fixed_id_node("7").with_id_validation();
        let req = RequestMessage::new("m").with_id(&7).unwrap();
        assert!(client.call(req, CallOptions::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_id_rejects_type_mismatch() {
        let client = fixed_id_node(r#""1""#).with_id_validation();
        let req = RequestMessage::new("m").with_id(&1).unwrap();

        let err = client.call(req, CallOptions::new()).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidDownstreamResponse(_)));
        assert_eq!(err.code(), Code::InvalidDownstreamResponse);
    }

    #[tokio::test]
    async fn test_validate_id_compares_large_numbers_exactly() {
        let client = fixed_id_node("18446744073709551617").with_id_validation();
        let raw_request = |id: &str| {
            let mut req = RequestMessage::new("m");
            req.set_raw_id(Some(RawValue::from_string(id.to_owned()).unwrap()));
            req
        };

        let err = client
            .call(raw_request("18446744073709551616"), CallOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidDownstreamResponse(_)));

        let resp = client
            .call(raw_request("18446744073709551617"), CallOptions::new())
            .await;
        assert!(resp.is_ok());
    }

    #[tokio::test]
    async fn test_validate_id_decodes_string_escapes() {
        let client = fixed_id_node(r#""\u0061""#).with_id_validation();
        let req = RequestMessage::new("m").with_id(&"a").unwrap();
        assert!(client.call(req, CallOptions::new()).await.is_ok());

        let client = fixed_id_node("null").with_id_validation();
        let req = RequestMessage::new("m").with_id(&"a").unwrap();
        assert!(client.call(req, CallOptions::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_validate_id_rejects_missing_id() {
        let client = client_fn(|_: RequestMessage, _: CallOptions| async {
            let resp = ResponseMessage::success(&1).map_err(ClientError::InvalidRequest)?;
            Ok::<_, ClientError>(resp.with_version("2.0"))
        })
        .with_id_validation();
        let req = RequestMessage::new("m").with_id(&"a").unwrap();

        let err = client.call(req, CallOptions::new()).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidDownstreamResponse(_)));
    }

    #[tokio::test]
    async fn test_validate_id_skips_notifications() {
        let client = fixed_id_node("99").with_id_validation();
        assert!(
            client
                .call(RequestMessage::new("m"), CallOptions::new())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_assignment_then_validation() {
        let (node, _) = recording_node();
        let client = node
            .with_id_validation()
            .with_default_version("2.0")
            .with_incremental_id();

        let resp = client
            .call(RequestMessage::new("m"), CallOptions::new())
            .await
            .unwrap();
        assert_eq!(resp.raw_id().unwrap().get(), r#""1""#);
    }
}
