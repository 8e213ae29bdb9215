//! Client-side error types.
//!
//! This module provides [`ClientError`], the error type for every client call,
//! and [`DownstreamKind`], the classification of transport-level failures.

use jsonrpc_axum_core::{Code, ErrorObject};

/// Classification of a failure to reach the downstream node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DownstreamKind {
    /// The peer refused the connection.
    ConnectionRefused,
    /// The call deadline expired before a response arrived.
    Timeout,
    /// The call was cancelled by the caller.
    Canceled,
    /// The peer closed the connection before a complete response.
    PrematureClose,
    /// Any other transport failure.
    Other,
}

impl DownstreamKind {
    /// HTTP-like status code describing this failure.
    pub fn status(&self) -> u16 {
        match self {
            DownstreamKind::ConnectionRefused => 502,
            DownstreamKind::Timeout => 504,
            DownstreamKind::Canceled => 499,
            DownstreamKind::PrematureClose => 502,
            DownstreamKind::Other => 502,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DownstreamKind::ConnectionRefused => "connection refused",
            DownstreamKind::Timeout => "timeout",
            DownstreamKind::Canceled => "canceled",
            DownstreamKind::PrematureClose => "premature close",
            DownstreamKind::Other => "transport error",
        }
    }
}

impl std::fmt::Display for DownstreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-side error variants.
///
/// Errors reported by the downstream node inside a well-formed response are
/// not `ClientError`s: they come back as a [`ResponseMessage`] carrying an
/// error member.
///
/// [`ResponseMessage`]: jsonrpc_axum_core::ResponseMessage
#[derive(Clone, Debug, thiserror::Error)]
pub enum ClientError {
    /// The outgoing request failed local validation and was never sent.
    #[error("invalid request: {}", .0.message())]
    InvalidRequest(ErrorObject),

    /// The downstream node could not be reached or did not answer in time.
    #[error("downstream error ({kind}): {message}")]
    Downstream {
        kind: DownstreamKind,
        message: String,
    },

    /// The downstream node answered outside the HTTP success range.
    #[error("downstream responded with HTTP status {0}")]
    InvalidDownstreamHttpStatus(u16),

    /// The downstream envelope was malformed, invalid, or failed to correlate.
    #[error("invalid downstream response: {0}")]
    InvalidDownstreamResponse(String),

    /// A multiplexed connection failed; every pending call receives the same error.
    #[error("connection error: {0}")]
    Connection(String),

    /// The connection is stopping and no longer accepts calls.
    #[error("connection is stopping")]
    Stopping,

    /// The connection has stopped.
    #[error("connection is stopped")]
    Stopped,
}

impl ClientError {
    /// Create a downstream error.
    pub fn downstream<S: Into<String>>(kind: DownstreamKind, message: S) -> Self {
        ClientError::Downstream {
            kind,
            message: message.into(),
        }
    }

    /// Create a downstream timeout error.
    pub fn timeout() -> Self {
        Self::downstream(DownstreamKind::Timeout, "deadline exceeded")
    }

    /// Create an invalid downstream response error.
    pub fn invalid_response<S: Into<String>>(message: S) -> Self {
        ClientError::InvalidDownstreamResponse(message.into())
    }

    /// Whether this error is a call deadline expiring.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ClientError::Downstream {
                kind: DownstreamKind::Timeout,
                ..
            }
        )
    }

    /// Get the error code this error maps to.
    pub fn code(&self) -> Code {
        match self {
            ClientError::InvalidRequest(err) => err.code(),
            ClientError::Downstream { .. }
            | ClientError::Connection(_)
            | ClientError::Stopping
            | ClientError::Stopped => Code::DownstreamError,
            ClientError::InvalidDownstreamHttpStatus(_) => Code::InvalidDownstreamHttpStatus,
            ClientError::InvalidDownstreamResponse(_) => Code::InvalidDownstreamResponse,
        }
    }

    /// HTTP-like status code for transport failures, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Downstream { kind, .. } => Some(kind.status()),
            ClientError::Connection(_) | ClientError::Stopping | ClientError::Stopped => Some(502),
            ClientError::InvalidDownstreamHttpStatus(status) => Some(*status),
            _ => None,
        }
    }
}

impl From<ClientError> for ErrorObject {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::InvalidRequest(obj) => obj,
            ClientError::InvalidDownstreamHttpStatus(status) => {
                ErrorObject::invalid_downstream_http_status(status)
            }
            ClientError::InvalidDownstreamResponse(message) => {
                ErrorObject::invalid_downstream_response(message)
            }
            other => {
                let status = other.status().unwrap_or(502);
                ErrorObject::downstream(other.to_string())
                    .with_data(&serde_json::json!({ "status": status }))
            }
        }
    }
}
