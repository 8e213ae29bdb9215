//! Forwarding requests to a downstream node.

use std::time::Duration;

use jsonrpc_axum_client::{BoxFuture, CallOptions, Client};
use jsonrpc_axum_core::RequestMessage;

use crate::handler::Handler;
use crate::response::{ResponseWriter, write_error};

/// Forwards each request through a [`Client`] and writes what comes back.
///
/// The downstream response is written with the inbound request's id, so the
/// caller sees its own id even when the client assigns a different one on
/// the way down. Client failures are written as error responses carrying
/// their downstream classification. Notifications are forwarded but nothing
/// is written back.
///
/// # Example
///
/// ```ignore
/// use jsonrpc_axum::{ForwardHandler, Router};
/// use jsonrpc_axum_client::HttpClient;
///
/// let node = HttpClient::new("http://localhost:8545")?;
/// let router = Router::new()
///     .method("eth_sendTransaction", sign_and_send)
///     .default_handler(ForwardHandler::new(node));
/// ```
#[derive(Debug, Clone)]
pub struct ForwardHandler<C> {
    client: C,
    timeout: Option<Duration>,
}

impl<C: Client> ForwardHandler<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    /// Bound every forwarded call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: Client> Handler for ForwardHandler<C> {
    fn serve<'a>(
        &'a self,
        writer: &'a mut dyn ResponseWriter,
        request: RequestMessage,
    ) -> BoxFuture<'a, ()> {
        let mut options = CallOptions::new();
        if let Some(timeout) = self.timeout {
            options = options.timeout(timeout);
        }
        let inbound_id = request.raw_id().map(ToOwned::to_owned);
        let method = request.method().to_owned();

        Box::pin(async move {
            let outcome = self.client.call(request, options).await;
            if inbound_id.is_none() {
                if let Err(err) = outcome {
                    tracing::debug!(rpc.method = %method, error = %err, "forwarding notification failed");
                }
                return;
            }
            let written = match outcome {
                Ok(response) => writer.write(response.with_raw_id(inbound_id)),
                Err(err) => {
                    tracing::debug!(rpc.method = %method, error = %err, "forwarding failed");
                    write_error(writer, err)
                }
            };
            if let Err(err) = written {
                tracing::warn!(rpc.method = %method, error = %err, "failed to write response");
            }
        })
    }
}
