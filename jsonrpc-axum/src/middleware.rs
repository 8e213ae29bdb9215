//! Handler middleware.
//!
//! - [`with_request_defaults`]: responses inherit the request id and version
//! - [`LoggedHandler`]: a tracing span per request and a log line per outcome

use std::time::Instant;

use jsonrpc_axum_client::BoxFuture;
use jsonrpc_axum_core::{DEFAULT_VERSION, RequestMessage, ResponseMessage};
use tracing::Instrument;

use crate::handler::Handler;
use crate::response::{ResponseWriter, WithId, WithVersion, WriteError};

// ============================================================================
// Request defaults
// ============================================================================

/// Fills in the response id and version from the request.
///
/// Created by [`with_request_defaults`].
#[derive(Clone, Debug)]
pub struct RequestDefaults<H> {
    inner: H,
}

/// Wrap `handler` so the responses it writes carry the request id and
/// version unless they set their own.
///
/// A request with an empty version falls back to `"2.0"`.
pub fn with_request_defaults<H: Handler>(handler: H) -> RequestDefaults<H> {
    RequestDefaults { inner: handler }
}

impl<H: Handler> Handler for RequestDefaults<H> {
    fn serve<'a>(
        &'a self,
        writer: &'a mut dyn ResponseWriter,
        request: RequestMessage,
    ) -> BoxFuture<'a, ()> {
        let id = request.raw_id().map(ToOwned::to_owned);
        let version = match request.version() {
            "" => DEFAULT_VERSION.to_owned(),
            v => v.to_owned(),
        };
        Box::pin(async move {
            let mut writer = WithVersion::new(WithId::new(writer, id), version);
            self.inner.serve(&mut writer, request).await;
        })
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Logs every request and the outcome its handler writes.
///
/// Each request runs in a `jsonrpc.request` span carrying the method and
/// version. Successes are logged at debug level, error responses at info.
#[derive(Clone, Debug)]
pub struct LoggedHandler<H> {
    inner: H,
}

impl<H: Handler> LoggedHandler<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

/// Remembers what was written on behalf of the wrapped writer.
struct Observed<'w> {
    inner: &'w mut dyn ResponseWriter,
    outcome: Option<Result<(), i64>>,
}

impl ResponseWriter for Observed<'_> {
    fn write(&mut self, response: ResponseMessage) -> Result<(), WriteError> {
        let outcome = match response.decode_error() {
            Ok(Some(err)) => Err(err.code().as_i64()),
            _ => Ok(()),
        };
        self.inner.write(response)?;
        self.outcome = Some(outcome);
        Ok(())
    }
}

impl<H: Handler> Handler for LoggedHandler<H> {
    fn serve<'a>(
        &'a self,
        writer: &'a mut dyn ResponseWriter,
        request: RequestMessage,
    ) -> BoxFuture<'a, ()> {
        let span = tracing::info_span!(
            "jsonrpc.request",
            rpc.method = %request.method(),
            rpc.version = %request.version(),
        );
        let notification = !request.has_id();
        Box::pin(
            async move {
                let start = Instant::now();
                let mut observed = Observed {
                    inner: writer,
                    outcome: None,
                };
                self.inner.serve(&mut observed, request).await;
                let elapsed_ms = start.elapsed().as_millis() as u64;
                match observed.outcome {
                    Some(Ok(())) => tracing::debug!(elapsed_ms, "request served"),
                    Some(Err(code)) => tracing::info!(elapsed_ms, code, "request failed"),
                    None if notification => tracing::debug!(elapsed_ms, "notification served"),
                    None => tracing::warn!(elapsed_ms, "handler wrote no response"),
                }
            }
            .instrument(span),
        )
    }
}
