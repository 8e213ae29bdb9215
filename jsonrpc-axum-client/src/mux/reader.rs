//! The read task: frames in, validated responses out.

use std::fmt::Display;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use jsonrpc_axum_core::ResponseMessage;
use tokio::sync::{mpsc, watch};

use super::Inbound;
use crate::ClientError;

/// Why the connection ended.
#[derive(Debug, Clone)]
pub(crate) enum Terminal {
    /// The owner requested a stop; the read ended because of it.
    LocalStop,
    /// The connection failed.
    Failed(ClientError),
}

/// Read frames until the stream ends, fails, or a stop is requested.
///
/// Frames that fail to decode or validate are logged and skipped. Exactly one
/// [`Inbound::Closed`] is sent, as the last message.
pub(crate) async fn read_loop<R, E>(
    mut reader: R,
    mut stop: watch::Receiver<bool>,
    inbound: mpsc::Sender<Inbound>,
) where
    R: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    let terminal = loop {
        let frame = tokio::select! {
            biased;
            // a dropped sender means every handle to the connection is gone
            _ = stop.changed() => break Terminal::LocalStop,
            frame = reader.next() => frame,
        };

        match frame {
            Some(Ok(bytes)) => match decode(&bytes) {
                Ok(response) => {
                    if inbound.send(Inbound::Response(response)).await.is_err() {
                        return;
                    }
                }
                Err(reason) => {
                    tracing::warn!(
                        frame_len = bytes.len(),
                        reason = %reason,
                        "discarding malformed inbound frame"
                    );
                }
            },
            Some(Err(e)) => break classify(&stop, format!("read failed: {}", e)),
            None => break classify(&stop, "connection closed by peer".to_string()),
        }
    };

    tracing::debug!(terminal = ?terminal, "read task finished");
    let _ = inbound.send(Inbound::Closed(terminal)).await;
}

fn decode(bytes: &[u8]) -> Result<ResponseMessage, String> {
    let response = ResponseMessage::from_slice(bytes).map_err(|e| e.message().to_owned())?;
    response.validate().map_err(|e| e.message().to_owned())?;
    Ok(response)
}

/// A read that ends after a stop was requested is the stop, not a fault.
fn classify(stop: &watch::Receiver<bool>, message: String) -> Terminal {
    if *stop.borrow() {
        Terminal::LocalStop
    } else {
        Terminal::Failed(ClientError::Connection(message))
    }
}
