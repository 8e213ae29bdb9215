//! JSON-RPC error codes and the wire error object.
//!
//! This module provides the core error types used by the protocol:
//! - [`Code`]: Numeric error codes, including the gateway-specific downstream codes
//! - [`ErrorObject`]: The `error` member of a response, also usable as a Rust error

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// JSON-RPC error codes.
///
/// The first five are the reserved codes from the JSON-RPC 2.0 specification.
/// The `Downstream*` codes live in the implementation-defined server error range
/// and describe failures reaching or understanding the remote node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Code {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    DownstreamError,
    InvalidDownstreamHttpStatus,
    InvalidDownstreamResponse,
    /// Any code outside the known taxonomy, preserved as received.
    Other(i64),
}

impl Code {
    /// Get the numeric value written on the wire.
    pub fn as_i64(&self) -> i64 {
        match self {
            Code::ParseError => -32700,
            Code::InvalidRequest => -32600,
            Code::MethodNotFound => -32601,
            Code::InvalidParams => -32602,
            Code::InternalError => -32603,
            Code::DownstreamError => -32000,
            Code::InvalidDownstreamHttpStatus => -32001,
            Code::InvalidDownstreamResponse => -32002,
            Code::Other(code) => *code,
        }
    }

    /// Get a short human-readable name for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::ParseError => "parse error",
            Code::InvalidRequest => "invalid request",
            Code::MethodNotFound => "method not found",
            Code::InvalidParams => "invalid params",
            Code::InternalError => "internal error",
            Code::DownstreamError => "downstream error",
            Code::InvalidDownstreamHttpStatus => "invalid downstream HTTP status",
            Code::InvalidDownstreamResponse => "invalid downstream response",
            Code::Other(_) => "error",
        }
    }
}

impl From<i64> for Code {
    fn from(code: i64) -> Self {
        match code {
            -32700 => Code::ParseError,
            -32600 => Code::InvalidRequest,
            -32601 => Code::MethodNotFound,
            -32602 => Code::InvalidParams,
            -32603 => Code::InternalError,
            -32000 => Code::DownstreamError,
            -32001 => Code::InvalidDownstreamHttpStatus,
            -32002 => Code::InvalidDownstreamResponse,
            other => Code::Other(other),
        }
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.as_i64())
    }
}

/// The `error` member of a JSON-RPC response.
///
/// This is the error data type shared between client and server: handlers
/// return it, responses carry it, and message validation reports with it.
/// The optional `data` member is kept as raw JSON so it can be decoded into
/// any type later with [`ErrorObject::decode_data`].
///
/// # Wire Format
///
/// ```json
/// {"code": -32601, "message": "method not found: eth_foo", "data": {"method": "eth_foo"}}
/// ```
///
/// # Example
///
/// ```
/// use jsonrpc_axum_core::{Code, ErrorObject};
///
/// let err = ErrorObject::method_not_found("eth_foo");
/// assert_eq!(err.code(), Code::MethodNotFound);
/// assert_eq!(err.code().as_i64(), -32601);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct ErrorObject {
    code: i64,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Box<RawValue>>,
}

impl ErrorObject {
    /// Create a new error object with a code and message.
    pub fn new<S: Into<String>>(code: Code, message: S) -> Self {
        Self {
            code: code.as_i64(),
            message: message.into(),
            data: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> Code {
        Code::from(self.code)
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the raw `data` member, if any.
    pub fn raw_data(&self) -> Option<&RawValue> {
        self.data.as_deref()
    }

    /// Attach a `data` member.
    ///
    /// Values that fail to serialize are dropped rather than failing the error path.
    pub fn with_data<T: Serialize>(mut self, data: &T) -> Self {
        self.data = serde_json::value::to_raw_value(data).ok();
        self
    }

    /// Decode the `data` member into `T`.
    ///
    /// Returns `Ok(None)` when the error carries no data.
    pub fn decode_data<T: DeserializeOwned>(&self) -> Result<Option<T>, ErrorObject> {
        self.data
            .as_deref()
            .map(|raw| {
                serde_json::from_str(raw.get()).map_err(|e| {
                    ErrorObject::parse_error(format!("failed to decode error data: {}", e))
                })
            })
            .transpose()
    }

    /// Encode this error object as a raw JSON document.
    pub fn to_raw(&self) -> Box<RawValue> {
        // code, message and an already-valid raw document cannot fail to serialize
        serde_json::value::to_raw_value(self).expect("error object serializes to JSON")
    }

    /// Wrap an arbitrary local error as an internal error.
    ///
    /// An [`ErrorObject`] passed through here is returned unchanged.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        match err.downcast_ref::<ErrorObject>() {
            Some(obj) => obj.clone(),
            None => ErrorObject::internal(err.to_string()),
        }
    }

    // Convenience constructors for the taxonomy

    /// Create a parse error.
    pub fn parse_error<S: Into<String>>(message: S) -> Self {
        Self::new(Code::ParseError, message)
    }

    /// Create an invalid request error.
    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::new(Code::InvalidRequest, message)
    }

    /// Create a method not found error naming the method.
    pub fn method_not_found(method: &str) -> Self {
        Self::new(Code::MethodNotFound, format!("method not found: {}", method))
    }

    /// Create an invalid params error.
    pub fn invalid_params<S: Into<String>>(message: S) -> Self {
        Self::new(Code::InvalidParams, message)
    }

    /// Create an internal error.
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(Code::InternalError, message)
    }

    /// Create a downstream error.
    pub fn downstream<S: Into<String>>(message: S) -> Self {
        Self::new(Code::DownstreamError, message)
    }

    /// Create an invalid downstream HTTP status error carrying the status code.
    pub fn invalid_downstream_http_status(status: u16) -> Self {
        Self::new(
            Code::InvalidDownstreamHttpStatus,
            format!("downstream responded with HTTP status {}", status),
        )
        .with_data(&status)
    }

    /// Create an invalid downstream response error.
    pub fn invalid_downstream_response<S: Into<String>>(message: S) -> Self {
        Self::new(Code::InvalidDownstreamResponse, message)
    }
}

impl From<serde_json::Error> for ErrorObject {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_eof() {
            ErrorObject::parse_error(err.to_string())
        } else {
            ErrorObject::internal(err.to_string())
        }
    }
}

impl From<std::io::Error> for ErrorObject {
    fn from(err: std::io::Error) -> Self {
        ErrorObject::internal(err.to_string())
    }
}
