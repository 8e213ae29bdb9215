//! Request/response id rules and correlation keys.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;

use crate::ErrorObject;

/// Check that an id is a scalar string, a number, or null.
///
/// An absent id (`None`) is valid. Arrays, objects and booleans are rejected
/// with an [`InvalidRequest`](crate::Code::InvalidRequest) error.
pub fn validate_id(id: Option<&RawValue>) -> Result<(), ErrorObject> {
    let Some(raw) = id else {
        return Ok(());
    };
    let kind = match raw.get().trim_start().as_bytes().first() {
        Some(b'"') | Some(b'-') | Some(b'0'..=b'9') | Some(b'n') => return Ok(()),
        Some(b'[') => "array",
        Some(b'{') => "object",
        Some(b't') | Some(b'f') => "boolean",
        _ => "unknown value",
    };
    Err(ErrorObject::invalid_request(format!(
        "invalid id: must be a string, a number or null, got {}",
        kind
    )))
}

/// Correlation key for an id: its canonical wire bytes.
///
/// Two ids correlate only if their encodings are byte-identical, so `1`,
/// `1.0` and `"1"` are three different keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdKey(String);

impl IdKey {
    /// Build the key for a raw id.
    pub fn from_raw(raw: &RawValue) -> Self {
        IdKey(raw.get().to_owned())
    }

    /// Get the wire encoding backing this key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode a value into an owned raw JSON document.
pub(crate) fn to_raw<T: Serialize + ?Sized>(value: &T) -> Result<Box<RawValue>, ErrorObject> {
    serde_json::value::to_raw_value(value)
        .map_err(|e| ErrorObject::internal(format!("failed to encode value: {}", e)))
}

/// Deserialize a member that is present in the document, including an explicit `null`.
///
/// Paired with `#[serde(default)]` this keeps "absent" (`None`) apart from
/// "present and null" (`Some("null")`).
pub(crate) fn present<'de, D>(deserializer: D) -> Result<Option<Box<RawValue>>, D::Error>
where
    D: Deserializer<'de>,
{
    Box::<RawValue>::deserialize(deserializer).map(Some)
}
