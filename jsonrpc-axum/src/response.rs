//! Response writers.
//!
//! A [`ResponseWriter`] accepts the [`ResponseMessage`] a handler produces.
//! Writers compose: [`WithId`] and [`WithVersion`] fill in the id and version
//! of a response that does not carry them, so a handler can write a bare
//! result or error without repeating transport bookkeeping.
//!
//! ```
//! use jsonrpc_axum::{ResponseRecorder, WithId, WithVersion, write_result};
//! use serde_json::value::RawValue;
//!
//! let mut recorder = ResponseRecorder::new();
//! let id = RawValue::from_string("7".to_string()).unwrap();
//! {
//!     let mut writer = WithVersion::new(WithId::new(&mut recorder, Some(id)), "2.0");
//!     write_result(&mut writer, "0x1").unwrap();
//! }
//! let written = recorder.into_responses();
//! assert_eq!(
//!     written[0].to_vec().unwrap(),
//!     br#"{"jsonrpc":"2.0","result":"0x1","id":7}"#
//! );
//! ```

use jsonrpc_axum_core::{ErrorObject, ResponseMessage};
use serde::Serialize;
use serde_json::value::RawValue;

/// Error returned when a response cannot be written.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WriteError {
    /// The result value failed to serialize.
    #[error("failed to encode response: {0}")]
    Encode(String),
    /// The writer accepts a single response and already has one.
    #[error("a response was already written")]
    AlreadyWritten,
    /// The underlying channel is gone.
    #[error("response writer closed")]
    Closed,
}

/// Destination for the response a handler produces.
pub trait ResponseWriter: Send {
    fn write(&mut self, response: ResponseMessage) -> Result<(), WriteError>;
}

impl<W: ResponseWriter + ?Sized> ResponseWriter for &mut W {
    fn write(&mut self, response: ResponseMessage) -> Result<(), WriteError> {
        (**self).write(response)
    }
}

impl<W: ResponseWriter + ?Sized> ResponseWriter for Box<W> {
    fn write(&mut self, response: ResponseMessage) -> Result<(), WriteError> {
        (**self).write(response)
    }
}

/// Write a success response carrying `result`.
pub fn write_result<T>(writer: &mut dyn ResponseWriter, result: &T) -> Result<(), WriteError>
where
    T: Serialize + ?Sized,
{
    let response =
        ResponseMessage::success(result).map_err(|e| WriteError::Encode(e.message().to_owned()))?;
    writer.write(response)
}

/// Write an error response.
///
/// Any error convertible into an [`ErrorObject`] is accepted; client errors
/// keep their downstream classification.
pub fn write_error<E: Into<ErrorObject>>(
    writer: &mut dyn ResponseWriter,
    err: E,
) -> Result<(), WriteError> {
    writer.write(ResponseMessage::failure(err.into()))
}

// ============================================================================
// Defaulting writers
// ============================================================================

/// Sets the id of responses written without one.
#[derive(Debug)]
pub struct WithId<W> {
    inner: W,
    id: Option<Box<RawValue>>,
}

impl<W> WithId<W> {
    /// Wrap `inner`; a `None` id leaves responses untouched.
    pub fn new(inner: W, id: Option<Box<RawValue>>) -> Self {
        Self { inner, id }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: ResponseWriter> ResponseWriter for WithId<W> {
    fn write(&mut self, mut response: ResponseMessage) -> Result<(), WriteError> {
        if !response.has_id() {
            response.set_raw_id(self.id.clone());
        }
        self.inner.write(response)
    }
}

/// Sets the version of responses written with an empty one.
#[derive(Debug)]
pub struct WithVersion<W> {
    inner: W,
    version: String,
}

impl<W> WithVersion<W> {
    pub fn new<S: Into<String>>(inner: W, version: S) -> Self {
        Self {
            inner,
            version: version.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: ResponseWriter> ResponseWriter for WithVersion<W> {
    fn write(&mut self, mut response: ResponseMessage) -> Result<(), WriteError> {
        if response.version().is_empty() {
            response.set_version(self.version.clone());
        }
        self.inner.write(response)
    }
}

// ============================================================================
// Recorder
// ============================================================================

/// An in-memory writer that keeps every response written to it.
#[derive(Debug, Default)]
pub struct ResponseRecorder {
    responses: Vec<ResponseMessage>,
    single: bool,
}

impl ResponseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder that accepts one response and rejects the rest with
    /// [`WriteError::AlreadyWritten`].
    pub fn single() -> Self {
        Self {
            responses: Vec::new(),
            single: true,
        }
    }

    pub fn responses(&self) -> &[ResponseMessage] {
        &self.responses
    }

    pub fn into_responses(self) -> Vec<ResponseMessage> {
        self.responses
    }

    /// Take the first response written, if any.
    pub fn into_first(self) -> Option<ResponseMessage> {
        self.responses.into_iter().next()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

impl ResponseWriter for ResponseRecorder {
    fn write(&mut self, response: ResponseMessage) -> Result<(), WriteError> {
        if self.single && !self.responses.is_empty() {
            return Err(WriteError::AlreadyWritten);
        }
        self.responses.push(response);
        Ok(())
    }
}
