//! The dispatch task: sole writer to the connection and sole owner of the
//! live-operation table.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{Sink, SinkExt};
use jsonrpc_axum_core::{ErrorObject, IdKey, ResponseMessage};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use super::operation::{Operation, Pending, Retire};
use super::reader::Terminal;
use super::{Inbound, Shared, State};
use crate::ClientError;

pub(crate) struct Dispatch<W> {
    pub(crate) writer: W,
    pub(crate) write_timeout: Duration,
    pub(crate) shared: Arc<Shared>,
    pub(crate) submissions: mpsc::Receiver<Operation>,
    pub(crate) inbound: mpsc::Receiver<Inbound>,
    pub(crate) retire: mpsc::UnboundedReceiver<Retire>,
    pub(crate) errors: oneshot::Sender<ClientError>,
    pub(crate) closed: watch::Sender<bool>,
}

impl<W> Dispatch<W>
where
    W: Sink<Bytes> + Unpin,
    W::Error: Display,
{
    pub(crate) async fn run(mut self) {
        let mut live: HashMap<IdKey, Pending> = HashMap::new();
        let mut accepting = true;

        let terminal = loop {
            tokio::select! {
                biased;
                inbound = self.inbound.recv() => match inbound {
                    Some(Inbound::Response(response)) => deliver(&mut live, response),
                    Some(Inbound::Closed(terminal)) => break terminal,
                    None => break Terminal::Failed(ClientError::Connection(
                        "read task ended unexpectedly".to_string(),
                    )),
                },
                Some(retire) = self.retire.recv() => {
                    if live.get(&retire.key).is_some_and(|p| p.serial == retire.serial) {
                        live.remove(&retire.key);
                        tracing::debug!(id = %retire.key, "retired abandoned operation");
                    }
                }
                op = self.submissions.recv(), if accepting => match op {
                    Some(op) => self.submit(&mut live, op).await,
                    // every handle dropped; the read task sees the stop signal close
                    None => accepting = false,
                },
            }
        };

        self.shutdown(live, terminal).await;
    }

    async fn submit(&mut self, live: &mut HashMap<IdKey, Pending>, op: Operation) {
        if op.is_abandoned() {
            return;
        }
        if live.contains_key(&op.key) {
            let message = format!("id {} is already in flight on this connection", op.key);
            op.fail(ClientError::InvalidRequest(ErrorObject::invalid_request(message)));
            return;
        }

        let deadline = op
            .deadline
            .unwrap_or_else(|| Instant::now() + self.write_timeout);
        let Operation {
            key,
            serial,
            frame,
            written,
            response,
            ..
        } = op;

        match tokio::time::timeout_at(deadline, self.writer.send(frame)).await {
            Ok(Ok(())) => {
                if written.send(Ok(())).is_ok() && !response.is_closed() {
                    live.insert(key, Pending { serial, response });
                }
            }
            Ok(Err(e)) => {
                tracing::debug!(id = %key, error = %e, "write failed");
                let _ = written.send(Err(ClientError::Connection(format!("write failed: {}", e))));
            }
            Err(_) => {
                tracing::debug!(id = %key, "write timed out");
                let _ = written.send(Err(ClientError::timeout()));
            }
        }
    }

    async fn shutdown(mut self, mut live: HashMap<IdKey, Pending>, terminal: Terminal) {
        self.shared.begin_stopping();

        let err = match &terminal {
            Terminal::LocalStop => ClientError::Stopped,
            Terminal::Failed(err) => err.clone(),
        };
        match &terminal {
            Terminal::LocalStop => tracing::debug!("connection stopped"),
            Terminal::Failed(err) => tracing::warn!(error = %err, "connection failed"),
        }

        // admitted but never written
        self.submissions.close();
        while let Ok(op) = self.submissions.try_recv() {
            op.fail(err.clone());
        }

        // the read task has exited, but drain anything it queued
        while let Ok(inbound) = self.inbound.try_recv() {
            if let Inbound::Response(response) = inbound {
                deliver(&mut live, response);
            }
        }

        for (_, pending) in live.drain() {
            let _ = pending.response.send(Err(err.clone()));
        }

        if let Terminal::Failed(err) = terminal {
            let _ = self.errors.send(err);
        }

        let _ = tokio::time::timeout(self.write_timeout, self.writer.close()).await;

        self.shared.set_state(State::Stopped);
        self.closed.send_replace(true);
    }
}

fn deliver(live: &mut HashMap<IdKey, Pending>, response: ResponseMessage) {
    let Some(key) = response.correlation_key() else {
        tracing::debug!("dropping response without id");
        return;
    };
    match live.remove(&key) {
        Some(pending) => {
            // the caller may have given up at this very moment
            let _ = pending.response.send(Ok(response));
        }
        None => tracing::debug!(id = %key, "dropping uncorrelated response"),
    }
}
