//! Multiplexed transport tests over in-memory frame pipes.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::channel::mpsc;
use futures::{Sink, SinkExt, StreamExt};
use jsonrpc_axum_client::{
    CallOptions, Client, ClientError, Code, Connection, ConnectionConfig, RequestMessage,
    ResponseMessage, Session,
};
use tokio::time::Instant;

/// The far end of the pipe.
struct Peer {
    requests: mpsc::Receiver<Bytes>,
    responses: mpsc::Sender<Result<Bytes, String>>,
}

impl Peer {
    async fn next_request(&mut self) -> RequestMessage {
        let frame = tokio::time::timeout(Duration::from_secs(5), self.requests.next())
            .await
            .expect("no request frame")
            .expect("request pipe closed");
        RequestMessage::from_slice(&frame).unwrap()
    }

    async fn reply(&mut self, id: u64, result: &str) {
        let resp = ResponseMessage::success(result)
            .unwrap()
            .with_version("2.0")
            .with_id(&id)
            .unwrap();
        self.send_raw(resp.to_bytes().unwrap()).await;
    }

    async fn reply_raw(&mut self, raw_id: &str, result: &str) {
        let id = serde_json::value::RawValue::from_string(raw_id.to_owned()).unwrap();
        let resp = ResponseMessage::success(result)
            .unwrap()
            .with_version("2.0")
            .with_raw_id(Some(id));
        self.send_raw(resp.to_bytes().unwrap()).await;
    }

    async fn send_raw(&mut self, frame: impl Into<Bytes>) {
        self.responses.send(Ok(frame.into())).await.unwrap();
    }
}

fn connect(config: ConnectionConfig) -> (Connection, Peer) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();

    let (req_tx, req_rx) = mpsc::channel(16);
    let (resp_tx, resp_rx) = mpsc::channel(16);
    let conn = Connection::new(resp_rx, req_tx, config);
    (
        conn,
        Peer {
            requests: req_rx,
            responses: resp_tx,
        },
    )
}

fn request(id: u64) -> RequestMessage {
    RequestMessage::new("eth_getBlockByNumber")
        .with_version("2.0")
        .with_id(&id)
        .unwrap()
}

fn spawn_call(
    conn: &Connection,
    req: RequestMessage,
) -> tokio::task::JoinHandle<Result<ResponseMessage, ClientError>> {
    let conn = conn.clone();
    tokio::spawn(async move { conn.call(req, CallOptions::new()).await })
}

#[tokio::test]
async fn test_out_of_order_correlation() {
    let (conn, mut peer) = connect(ConnectionConfig::default());

    let a = spawn_call(&conn, request(1));
    let b = spawn_call(&conn, request(2));
    peer.next_request().await;
    peer.next_request().await;

    peer.reply(2, "second").await;
    peer.reply(1, "first").await;

    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();
    assert_eq!(a.decode_result::<String>().unwrap(), "first");
    assert_eq!(b.decode_result::<String>().unwrap(), "second");
}

#[tokio::test]
async fn test_sessions_reusing_caller_ids_share_connection() {
    let (conn, mut peer) = connect(ConnectionConfig::default());
    let shared = Arc::new(conn);
    let alice = Session::new(shared.clone(), "a");
    let bob = Session::new(shared, "b");

    let a = tokio::spawn(async move { alice.call(request(1), CallOptions::new()).await });
    let b = tokio::spawn(async move { bob.call(request(1), CallOptions::new()).await });

    let mut sent = Vec::new();
    for _ in 0..2 {
        let req = peer.next_request().await;
        sent.push(req.raw_id().unwrap().get().to_owned());
    }
    sent.sort();
    assert_eq!(sent, [r#""a.1""#, r#""b.1""#]);

    peer.reply_raw(r#""b.1""#, "bob").await;
    peer.reply_raw(r#""a.1""#, "alice").await;

    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();
    assert_eq!(a.raw_id().unwrap().get(), "1");
    assert_eq!(a.decode_result::<String>().unwrap(), "alice");
    assert_eq!(b.raw_id().unwrap().get(), "1");
    assert_eq!(b.decode_result::<String>().unwrap(), "bob");
}

#[tokio::test]
async fn test_cancelled_call_drops_late_response() {
    let (conn, mut peer) = connect(ConnectionConfig::default());

    let started = Instant::now();
    let err = conn
        .call(
            request(1),
            CallOptions::new().timeout(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();
    let elapsed = started.elapsed();
    assert!(err.is_timeout());
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_secs(2));

    peer.next_request().await;
    peer.reply(1, "late").await;

    // the connection keeps serving calls
    let next = spawn_call(&conn, request(3));
    peer.next_request().await;
    peer.reply(3, "ok").await;
    let resp = next.await.unwrap().unwrap();
    assert_eq!(resp.decode_result::<String>().unwrap(), "ok");
    assert!(!conn.is_closed());
}

#[tokio::test]
async fn test_timed_out_id_can_be_reused() {
    let (conn, mut peer) = connect(ConnectionConfig::default());

    let err = conn
        .call(request(5), CallOptions::new().timeout(Duration::from_millis(50)))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    peer.next_request().await;

    let again = spawn_call(&conn, request(5));
    peer.next_request().await;
    peer.reply(5, "again").await;
    let resp = again.await.unwrap().unwrap();
    assert_eq!(resp.decode_result::<String>().unwrap(), "again");
}

#[tokio::test]
async fn test_duplicate_in_flight_id() {
    let (conn, mut peer) = connect(ConnectionConfig::default());

    let first = spawn_call(&conn, request(1));
    peer.next_request().await;

    let err = conn.call(request(1), CallOptions::new()).await.unwrap_err();
    match err {
        ClientError::InvalidRequest(obj) => assert_eq!(obj.code(), Code::InvalidRequest),
        other => panic!("unexpected error: {other:?}"),
    }

    peer.reply(1, "first").await;
    assert!(first.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_malformed_frames_are_skipped() {
    let (conn, mut peer) = connect(ConnectionConfig::default());

    let call = spawn_call(&conn, request(1));
    peer.next_request().await;
    peer.send_raw("{not json").await;
    peer.send_raw(r#"{"jsonrpc":"2.0","id":1}"#).await;
    peer.reply(1, "ok").await;

    let resp = call.await.unwrap().unwrap();
    assert_eq!(resp.decode_result::<String>().unwrap(), "ok");
}

#[tokio::test]
async fn test_request_without_id_is_rejected() {
    let (conn, _peer) = connect(ConnectionConfig::default());

    let notification = RequestMessage::new("eth_subscribe").with_version("2.0");
    let err = conn
        .call(notification, CallOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_connection_failure_fans_out() {
    let (conn, mut peer) = connect(ConnectionConfig::default());
    let errors = conn.take_errors().unwrap();
    assert!(conn.take_errors().is_none());

    let a = spawn_call(&conn, request(1));
    let b = spawn_call(&conn, request(2));
    peer.next_request().await;
    peer.next_request().await;

    // peer goes away
    drop(peer.responses);

    let a = a.await.unwrap().unwrap_err();
    let b = b.await.unwrap().unwrap_err();
    assert!(matches!(a, ClientError::Connection(_)));
    assert_eq!(a.to_string(), b.to_string());

    let published = errors.await.unwrap();
    assert_eq!(published.to_string(), a.to_string());

    conn.closed().await;
    assert!(conn.is_closed());
    let err = conn.call(request(3), CallOptions::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::Stopped));
}

#[tokio::test]
async fn test_responses_queued_before_failure_are_delivered() {
    let (conn, mut peer) = connect(ConnectionConfig::default());

    let call = spawn_call(&conn, request(1));
    peer.next_request().await;
    peer.reply(1, "made it").await;
    drop(peer.responses);

    let resp = call.await.unwrap().unwrap();
    assert_eq!(resp.decode_result::<String>().unwrap(), "made it");
}

#[tokio::test]
async fn test_stop_fails_pending_calls() {
    let (conn, mut peer) = connect(ConnectionConfig::default());
    let errors = conn.take_errors().unwrap();

    let pending = spawn_call(&conn, request(1));
    peer.next_request().await;

    conn.stop().await;
    assert!(conn.is_closed());
    assert!(matches!(
        pending.await.unwrap().unwrap_err(),
        ClientError::Stopped
    ));

    // a requested stop publishes nothing
    assert!(errors.await.is_err());

    let err = conn.call(request(2), CallOptions::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::Stopped));
}

/// A sink whose close never completes, to hold a connection in stopping.
struct StuckOnClose;

impl Sink<Bytes> for StuckOnClose {
    type Error = std::convert::Infallible;

    fn poll_ready(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, _: Bytes) -> Result<(), Self::Error> {
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Pending
    }
}

#[tokio::test]
async fn test_stopping_then_stopped() {
    let (_resp_tx, resp_rx) = mpsc::channel::<Result<Bytes, String>>(1);
    let conn = Connection::new(
        resp_rx,
        StuckOnClose,
        ConnectionConfig::new().write_timeout(Duration::from_millis(300)),
    );

    let stopper = {
        let conn = conn.clone();
        tokio::spawn(async move { conn.stop().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = conn.call(request(1), CallOptions::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::Stopping));

    stopper.await.unwrap();
    let err = conn.call(request(2), CallOptions::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::Stopped));
}

#[tokio::test]
async fn test_stop_timeout() {
    let (_resp_tx, resp_rx) = mpsc::channel::<Result<Bytes, String>>(1);
    let conn = Connection::new(
        resp_rx,
        StuckOnClose,
        ConnectionConfig::new().write_timeout(Duration::from_secs(5)),
    );

    let err = conn
        .stop_timeout(Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert!(!conn.is_closed());
}
