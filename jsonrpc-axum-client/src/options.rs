//! Per-call settings.

use http::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use tokio::time::Instant;

/// Options for configuring an individual call.
///
/// A call is bounded by the earlier of its `deadline` and `now + timeout`.
/// Transports fall back to their own defaults when neither is set. Dropping
/// the call future cancels it.
///
/// # Example
///
/// ```ignore
/// use jsonrpc_axum_client::{CallOptions, Client};
/// use std::time::Duration;
///
/// let options = CallOptions::new()
///     .timeout(Duration::from_secs(5))
///     .header("authorization", "Bearer token123");
///
/// let response = client.call(request, options).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub(crate) timeout: Option<Duration>,
    pub(crate) deadline: Option<Instant>,
    pub(crate) headers: HeaderMap,
}

impl CallOptions {
    /// No timeout, no deadline, no headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout for this call, measured from when the call starts.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set an absolute deadline for this call.
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Resolve the instant at which this call expires.
    ///
    /// `fallback` is used as a timeout when the options set neither a timeout
    /// nor a deadline. Returns `None` for an unbounded call.
    pub fn expires_at(&self, fallback: Option<Duration>) -> Option<Instant> {
        let now = Instant::now();
        let from_timeout = self.timeout.or(if self.deadline.is_none() {
            fallback
        } else {
            None
        });
        match (self.deadline, from_timeout.map(|t| now + t)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Add a custom header for this call.
    ///
    /// Only HTTP transports send headers; multiplexed connections ignore them.
    ///
    /// # Panics
    ///
    /// Panics if the header name or value is invalid.
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        K::Error: std::fmt::Debug,
        V: TryInto<HeaderValue>,
        V::Error: std::fmt::Debug,
    {
        let name = name.try_into().expect("invalid header name");
        let value = value.try_into().expect("invalid header value");
        self.headers.insert(name, value);
        self
    }

    /// Like [`header`](Self::header), but `None` on an invalid name or value.
    pub fn try_header<K, V>(mut self, name: K, value: V) -> Option<Self>
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        let name = name.try_into().ok()?;
        let value = value.try_into().ok()?;
        self.headers.insert(name, value);
        Some(self)
    }
}
