//! Per-session views of a shared client.
//!
//! A proxy typically keeps one multiplexed [`Connection`](crate::Connection)
//! to the downstream node and serves many inbound sessions over it. Each
//! [`Session`] replaces the caller's id with one of its own, prefixed with
//! the session base, so callers that pick the same ids never collide on the
//! shared connection. The caller's id is put back on the response.

use std::sync::Arc;

use jsonrpc_axum_core::{DEFAULT_VERSION, RequestMessage, ResponseMessage};

use crate::client::{BoxFuture, Client};
use crate::interceptor::{DefaultVersion, IncrementalId, ValidateId};
use crate::{CallOptions, ClientError, ClientExt};

/// A client bound to one base id and one default version.
///
/// Every outgoing request is sent with a fresh id `"<base>.<n>"` and the
/// default version when its own is empty. The response is checked against
/// that id, then handed back carrying the caller's id. A request sent
/// without an id gets its response with the assigned one.
pub struct Session<C: ?Sized> {
    base: String,
    client: IncrementalId<DefaultVersion<ValidateId<Arc<C>>>>,
}

impl<C: Client + ?Sized> Session<C> {
    /// Bind a session with the default version `"2.0"`.
    pub fn new<S: Into<String>>(client: Arc<C>, base: S) -> Self {
        Self::with_version(client, base, DEFAULT_VERSION)
    }

    /// Bind a session with a custom default version.
    pub fn with_version<S, V>(client: Arc<C>, base: S, version: V) -> Self
    where
        S: Into<String>,
        V: Into<String>,
    {
        let base = base.into();
        let client = client
            .with_id_validation()
            .with_default_version(version)
            .with_incremental_id_base(base.clone());
        Self { base, client }
    }

    /// Get the base id of this session.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Get the shared client this session calls through.
    pub fn shared(&self) -> &Arc<C> {
        self.client.inner().inner().inner()
    }
}

impl<C: ?Sized> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl<C: Client + ?Sized> Client for Session<C> {
    fn call<'a>(
        &'a self,
        mut request: RequestMessage,
        options: CallOptions,
    ) -> BoxFuture<'a, Result<ResponseMessage, ClientError>> {
        let caller_id = request.raw_id().map(ToOwned::to_owned);
        request.set_raw_id(None);
        Box::pin(async move {
            let response = self.client.call(request, options).await?;
            Ok(match caller_id {
                Some(id) => response.with_raw_id(Some(id)),
                None => response,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client_fn;
    use std::sync::Mutex;

    fn shared_node() -> (Arc<dyn Client>, Arc<Mutex<Vec<RequestMessage>>>) {
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
        (Arc::new(node), seen)
    }

    #[tokio::test]
    async fn test_sessions_do_not_collide() {
        let (node, seen) = shared_node();
        let alice = Session::new(node.clone(), "a");
        let bob = Session::new(node, "b");

        alice
            .call(RequestMessage::new("m"), CallOptions::new())
            .await
            .unwrap();
        bob.call(RequestMessage::new("m"), CallOptions::new())
            .await
            .unwrap();
        alice
            .call(RequestMessage::new("m"), CallOptions::new())
            .await
            .unwrap();

        let ids: Vec<String> = seen
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.raw_id().unwrap().get().to_owned())
            .collect();
        assert_eq!(ids, [r#""a.1""#, r#""b.1""#, r#""a.2""#]);
        assert_eq!(alice.base(), "a");
    }

    #[tokio::test]
    async fn test_session_rebinds_caller_ids() {
        let (node, seen) = shared_node();
        let alice = Session::new(node.clone(), "a");
        let bob = Session::new(node, "b");

        let req = || RequestMessage::new("m").with_id(&1).unwrap();
        let from_alice = alice.call(req(), CallOptions::new()).await.unwrap();
        let from_bob = bob.call(req(), CallOptions::new()).await.unwrap();

        assert_eq!(from_alice.raw_id().unwrap().get(), "1");
        assert_eq!(from_bob.raw_id().unwrap().get(), "1");
        let ids: Vec<String> = seen
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.raw_id().unwrap().get().to_owned())
            .collect();
        assert_eq!(ids, [r#""a.1""#, r#""b.1""#]);
    }

    #[tokio::test]
    async fn test_session_defaults_version() {
        let (node, seen) = shared_node();
        let session = Session::new(node, "s");

        session
            .call(RequestMessage::new("m"), CallOptions::new())
            .await
            .unwrap();
        assert_eq!(seen.lock().unwrap()[0].version(), "2.0");
    }

    #[tokio::test]
    async fn test_session_validates_ids() {
        let node: Arc<dyn Client> = Arc::new(client_fn(|_: RequestMessage, _: CallOptions| async {
            let resp = ResponseMessage::success(&"ok").map_err(ClientError::InvalidRequest)?;
            Ok::<_, ClientError>(resp.with_version("2.0").with_id(&"other").unwrap())
        }));
        let session = Session::new(node, "s");

        let err = session
            .call(RequestMessage::new("m"), CallOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidDownstreamResponse(_)));
    }
}
