//! Bookkeeping for one in-flight exchange.

use bytes::Bytes;
use jsonrpc_axum_core::{IdKey, ResponseMessage};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::ClientError;

/// A submitted call, handed from the caller to the dispatch task.
pub(crate) struct Operation {
    pub(crate) key: IdKey,
    pub(crate) serial: u64,
    pub(crate) frame: Bytes,
    /// Write deadline; the dispatch task falls back to its default write timeout.
    pub(crate) deadline: Option<Instant>,
    pub(crate) written: oneshot::Sender<Result<(), ClientError>>,
    pub(crate) response: oneshot::Sender<Result<ResponseMessage, ClientError>>,
}

impl Operation {
    /// Whether the submitting caller has gone away.
    pub(crate) fn is_abandoned(&self) -> bool {
        self.written.is_closed() || self.response.is_closed()
    }

    /// Fail the operation before it was written.
    pub(crate) fn fail(self, err: ClientError) {
        let _ = self.written.send(Err(err));
    }
}

/// An operation registered in the live table after a successful write.
pub(crate) struct Pending {
    pub(crate) serial: u64,
    pub(crate) response: oneshot::Sender<Result<ResponseMessage, ClientError>>,
}

/// Request to remove a live operation.
///
/// The serial guards against a stale retire removing a newer operation that
/// reuses the same id.
#[derive(Debug)]
pub(crate) struct Retire {
    pub(crate) key: IdKey,
    pub(crate) serial: u64,
}

/// Sends a [`Retire`] for its operation when dropped, unless disarmed.
///
/// Held by the waiting caller, so a call that times out or whose future is
/// dropped retires its operation instead of leaving it until connection death.
pub(crate) struct RetireGuard {
    retire: Option<(Retire, mpsc::UnboundedSender<Retire>)>,
}

impl RetireGuard {
    pub(crate) fn new(key: IdKey, serial: u64, tx: mpsc::UnboundedSender<Retire>) -> Self {
        Self {
            retire: Some((Retire { key, serial }, tx)),
        }
    }

    /// The operation left the live table on its own; nothing to retire.
    pub(crate) fn disarm(mut self) {
        self.retire = None;
    }
}

impl Drop for RetireGuard {
    fn drop(&mut self) {
        if let Some((retire, tx)) = self.retire.take() {
            // the dispatch task may already be gone
            let _ = tx.send(retire);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::value::RawValue;

    fn key(s: &str) -> IdKey {
        IdKey::from_raw(&RawValue::from_string(s.to_owned()).unwrap())
    }

    #[test]
    fn test_guard_sends_retire_on_drop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        drop(RetireGuard::new(key("1"), 7, tx));

        let retire = rx.try_recv().unwrap();
        assert_eq!(retire.key, key("1"));
        assert_eq!(retire.serial, 7);
    }

    #[test]
    fn test_disarmed_guard_is_silent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        RetireGuard::new(key("1"), 7, tx).disarm();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_operation_abandoned_when_caller_gone() {
        let (written, written_rx) = oneshot::channel();
        let (response, _response_rx) = oneshot::channel();
        let op = Operation {
            key: key("1"),
            serial: 0,
            frame: Bytes::new(),
            deadline: None,
            written,
            response,
        };
        assert!(!op.is_abandoned());
        drop(written_rx);
        assert!(op.is_abandoned());
    }
}
