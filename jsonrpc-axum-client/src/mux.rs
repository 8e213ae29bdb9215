//! Persistent multiplexed transport.
//!
//! A [`Connection`] carries many concurrent calls over one full-duplex
//! connection whose responses may return in any order. Responses are
//! correlated to calls by the canonical wire bytes of their id, so `1`, `1.0`
//! and `"1"` are different ids.
//!
//! # Tasks
//!
//! Each connection runs exactly two background tasks:
//!
//! - the **read task** decodes and validates inbound frames, skipping (and
//!   logging) frames that fail, and forwards responses to the dispatch task
//! - the **dispatch task** is the only writer to the connection and the only
//!   owner of the live-operation table; it serializes submissions, inbound
//!   responses and retirements of abandoned calls in one loop
//!
//! A call waits for its write to complete and then for its response, bounded
//! by the call's [`CallOptions`] deadline. A call that times out or is dropped
//! retires its operation from the live table, and a response arriving later
//! is dropped.
//!
//! # Termination
//!
//! When the connection fails, every pending call receives the same
//! [`ClientError::Connection`] and the error is published once on
//! [`Connection::take_errors`]. A requested [`stop`](Connection::stop) fails
//! pending calls with [`ClientError::Stopped`] and publishes nothing. Calls
//! made while stopping or after stopping fail fast with
//! [`ClientError::Stopping`] or [`ClientError::Stopped`].
//!
//! # Example
//!
//! ```ignore
//! use jsonrpc_axum_client::{CallOptions, Client, Connection, ConnectionConfig};
//!
//! // frames: a Stream of inbound text frames, sink: a Sink of outbound frames
//! let conn = Connection::new(frames, sink, ConnectionConfig::default());
//!
//! let request = RequestMessage::new("eth_blockNumber").with_version("2.0").with_id(&1)?;
//! let response = conn.call(request, CallOptions::new().timeout(Duration::from_secs(5))).await?;
//!
//! conn.stop().await;
//! ```

mod dispatch;
mod operation;
mod reader;

use std::fmt::Display;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use futures::{Sink, Stream};
use jsonrpc_axum_core::{ErrorObject, RequestMessage, ResponseMessage};
use tokio::sync::{mpsc, oneshot, watch};

use self::dispatch::Dispatch;
use self::operation::{Operation, Retire, RetireGuard};
use self::reader::{Terminal, read_loop};
use crate::client::{BoxFuture, Client};
use crate::{CallOptions, ClientError};

/// Configuration for a [`Connection`].
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    write_timeout: Duration,
    submit_capacity: usize,
    inbound_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            write_timeout: Duration::from_secs(10),
            submit_capacity: 64,
            inbound_capacity: 256,
        }
    }
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write timeout for calls without a deadline.
    ///
    /// Default: 10 seconds.
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Number of submitted calls that may wait for the dispatch task.
    ///
    /// Default: 64.
    pub fn submit_capacity(mut self, capacity: usize) -> Self {
        self.submit_capacity = capacity.max(1);
        self
    }

    /// Number of decoded responses that may wait for the dispatch task.
    ///
    /// Default: 256.
    pub fn inbound_capacity(mut self, capacity: usize) -> Self {
        self.inbound_capacity = capacity.max(1);
        self
    }
}

/// Messages from the read task to the dispatch task.
#[derive(Debug)]
pub(crate) enum Inbound {
    Response(ResponseMessage),
    /// Always the last message.
    Closed(Terminal),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum State {
    Running = 0,
    Stopping = 1,
    Stopped = 2,
}

/// State shared between the handles and the dispatch task.
#[derive(Debug)]
pub(crate) struct Shared {
    state: AtomicU8,
}

impl Shared {
    fn state(&self) -> State {
        match self.state.load(Ordering::Acquire) {
            0 => State::Running,
            1 => State::Stopping,
            _ => State::Stopped,
        }
    }

    pub(crate) fn set_state(&self, state: State) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Move from running to stopping; later states are kept.
    pub(crate) fn begin_stopping(&self) {
        let _ = self.state.compare_exchange(
            State::Running as u8,
            State::Stopping as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    fn refuse(&self) -> Option<ClientError> {
        match self.state() {
            State::Running => None,
            State::Stopping => Some(ClientError::Stopping),
            State::Stopped => Some(ClientError::Stopped),
        }
    }

    /// Error for a call that lost its channel to the dispatch task.
    fn lost(&self) -> ClientError {
        self.refuse().unwrap_or(ClientError::Stopped)
    }
}

struct Inner {
    shared: Arc<Shared>,
    submit: mpsc::Sender<Operation>,
    retire: mpsc::UnboundedSender<Retire>,
    stop: watch::Sender<bool>,
    closed: watch::Receiver<bool>,
    errors: Mutex<Option<oneshot::Receiver<ClientError>>>,
    serial: AtomicU64,
}

/// A multiplexed connection.
///
/// Cloning is cheap and clones share the connection. When every clone is
/// dropped the connection stops as if [`stop`](Connection::stop) was called.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.inner.shared.state())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Start a connection over a frame stream and a frame sink.
    ///
    /// Each item of `reader` is one inbound JSON-RPC response frame; each item
    /// sent to `writer` is one outbound request frame. Spawns the read and
    /// dispatch tasks, so this must be called within a tokio runtime.
    pub fn new<R, E, W>(reader: R, writer: W, config: ConnectionConfig) -> Self
    where
        R: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
        E: Display + Send + 'static,
        W: Sink<Bytes> + Send + Unpin + 'static,
        W::Error: Display + Send,
    {
        let shared = Arc::new(Shared {
            state: AtomicU8::new(State::Running as u8),
        });
        let (submit_tx, submit_rx) = mpsc::channel(config.submit_capacity);
        let (inbound_tx, inbound_rx) = mpsc::channel(config.inbound_capacity);
        let (retire_tx, retire_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        let (closed_tx, closed_rx) = watch::channel(false);
        let (errors_tx, errors_rx) = oneshot::channel();

        tokio::spawn(read_loop(reader, stop_rx, inbound_tx));
        tokio::spawn(
            Dispatch {
                writer,
                write_timeout: config.write_timeout,
                shared: shared.clone(),
                submissions: submit_rx,
                inbound: inbound_rx,
                retire: retire_rx,
                errors: errors_tx,
                closed: closed_tx,
            }
            .run(),
        );

        Self {
            inner: Arc::new(Inner {
                shared,
                submit: submit_tx,
                retire: retire_tx,
                stop: stop_tx,
                closed: closed_rx,
                errors: Mutex::new(Some(errors_rx)),
                serial: AtomicU64::new(0),
            }),
        }
    }

    /// Take the receiver on which a connection failure is published once.
    ///
    /// Returns `None` after the first call. The receiver yields an error
    /// only if the connection failed; after a requested stop it is closed
    /// without a value.
    pub fn take_errors(&self) -> Option<oneshot::Receiver<ClientError>> {
        self.inner
            .errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Whether the connection has fully stopped.
    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }

    /// Wait until the connection has fully stopped, for any reason.
    pub async fn closed(&self) {
        let mut closed = self.inner.closed.clone();
        // the dispatch task sets the flag before dropping the sender
        let _ = closed.wait_for(|closed| *closed).await;
    }

    /// Stop the connection and wait until every pending call has been failed
    /// and the writer closed.
    pub async fn stop(&self) {
        self.inner.shared.begin_stopping();
        self.inner.stop.send_replace(true);
        self.closed().await;
    }

    /// Like [`stop`](Self::stop), but gives up waiting after `timeout`.
    ///
    /// The stop still proceeds in the background.
    pub async fn stop_timeout(&self, timeout: Duration) -> Result<(), ClientError> {
        tokio::time::timeout(timeout, self.stop())
            .await
            .map_err(|_| ClientError::timeout())
    }

    async fn send(
        &self,
        request: RequestMessage,
        options: CallOptions,
    ) -> Result<ResponseMessage, ClientError> {
        let shared = &self.inner.shared;
        if let Some(err) = shared.refuse() {
            return Err(err);
        }
        request.validate().map_err(ClientError::InvalidRequest)?;
        let key = request.correlation_key().ok_or_else(|| {
            ClientError::InvalidRequest(ErrorObject::invalid_request(
                "multiplexed calls require an id",
            ))
        })?;
        let frame = request.to_bytes().map_err(ClientError::InvalidRequest)?;

        let deadline = options.expires_at(None);
        let serial = self.inner.serial.fetch_add(1, Ordering::Relaxed);
        let (written_tx, written_rx) = oneshot::channel();
        let (response_tx, response_rx) = oneshot::channel();
        let guard = RetireGuard::new(key.clone(), serial, self.inner.retire.clone());
        let op = Operation {
            key,
            serial,
            frame,
            deadline,
            written: written_tx,
            response: response_tx,
        };

        let wait = async {
            self.inner
                .submit
                .send(op)
                .await
                .map_err(|_| shared.lost())?;
            written_rx.await.map_err(|_| shared.lost())??;
            response_rx.await.map_err(|_| shared.lost())?
        };
        let result = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, wait)
                .await
                .unwrap_or_else(|_| Err(ClientError::timeout())),
            None => wait.await,
        };

        if !result.as_ref().is_err_and(ClientError::is_timeout) {
            // delivered, failed before registration, or drained at shutdown
            guard.disarm();
        }
        result
    }
}

impl Client for Connection {
    fn call<'a>(
        &'a self,
        request: RequestMessage,
        options: CallOptions,
    ) -> BoxFuture<'a, Result<ResponseMessage, ClientError>> {
        Box::pin(self.send(request, options))
    }
}
