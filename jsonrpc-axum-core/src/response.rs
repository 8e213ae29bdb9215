//! JSON-RPC response message.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::ErrorObject;
use crate::id::{IdKey, present, to_raw, validate_id};
use crate::request::null_raw;

/// A JSON-RPC response.
///
/// `result`, `error` and `id` are kept as raw JSON. A present `"result":null`
/// is a valid success and is preserved on the wire; `"error":null` is read as
/// no error. Absent members are omitted when encoding.
///
/// # Wire Format
///
/// ```json
/// {"jsonrpc":"2.0","result":"0x1","id":1}
/// {"jsonrpc":"2.0","error":{"code":-32601,"message":"method not found: eth_foo"},"id":1}
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResponseMessage {
    #[serde(rename = "jsonrpc", default)]
    version: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    result: Option<Box<RawValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<Box<RawValue>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    id: Option<Box<RawValue>>,
}

impl ResponseMessage {
    /// Build a success response carrying `result`.
    pub fn success<T: Serialize + ?Sized>(result: &T) -> Result<Self, ErrorObject> {
        Ok(Self {
            result: Some(to_raw(result)?),
            ..Default::default()
        })
    }

    /// Build a success response from an already-encoded result.
    pub fn from_raw_result(result: Box<RawValue>) -> Self {
        Self {
            result: Some(result),
            ..Default::default()
        }
    }

    /// Build an error response.
    pub fn failure(error: ErrorObject) -> Self {
        Self {
            error: Some(error.to_raw()),
            ..Default::default()
        }
    }

    /// Decode a response from wire bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ErrorObject> {
        serde_json::from_slice(bytes)
            .map_err(|e| ErrorObject::parse_error(format!("invalid response body: {}", e)))
    }

    /// Encode this response to wire bytes.
    pub fn to_vec(&self) -> Result<Vec<u8>, ErrorObject> {
        serde_json::to_vec(self)
            .map_err(|e| ErrorObject::internal(format!("failed to encode response: {}", e)))
    }

    /// Encode this response into a [`Bytes`] frame.
    pub fn to_bytes(&self) -> Result<Bytes, ErrorObject> {
        self.to_vec().map(Bytes::from)
    }

    /// Check the response against the protocol rules.
    ///
    /// A response must have a version, exactly one of `result` and `error`,
    /// and a scalar (or null) id.
    pub fn validate(&self) -> Result<(), ErrorObject> {
        if self.version.is_empty() {
            return Err(ErrorObject::invalid_request("missing version"));
        }
        match (&self.result, &self.error) {
            (None, None) => return Err(ErrorObject::invalid_request("missing result")),
            (Some(_), Some(_)) => {
                return Err(ErrorObject::invalid_request(
                    "response carries both result and error",
                ));
            }
            _ => {}
        }
        validate_id(self.id.as_deref())
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn raw_id(&self) -> Option<&RawValue> {
        self.id.as_deref()
    }

    pub fn raw_result(&self) -> Option<&RawValue> {
        self.result.as_deref()
    }

    pub fn raw_error(&self) -> Option<&RawValue> {
        self.error.as_deref()
    }

    pub fn has_id(&self) -> bool {
        self.id.is_some()
    }

    /// Whether this response signals success (no error member).
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Correlation key for this response's id, if it has one.
    pub fn correlation_key(&self) -> Option<IdKey> {
        self.id.as_deref().map(IdKey::from_raw)
    }

    /// Decode the id into `T`. Returns `Ok(None)` if the id is absent.
    pub fn decode_id<T: DeserializeOwned>(&self) -> Result<Option<T>, ErrorObject> {
        self.id
            .as_deref()
            .map(|raw| {
                serde_json::from_str(raw.get())
                    .map_err(|e| ErrorObject::invalid_request(format!("invalid id: {}", e)))
            })
            .transpose()
    }

    /// Decode the result into `T`. A missing result decodes as JSON `null`.
    pub fn decode_result<T: DeserializeOwned>(&self) -> Result<T, ErrorObject> {
        let raw = self.result.as_deref().map(RawValue::get).unwrap_or("null");
        serde_json::from_str(raw).map_err(|e| {
            ErrorObject::invalid_downstream_response(format!("failed to decode result: {}", e))
        })
    }

    /// Decode the error member, if present.
    pub fn decode_error(&self) -> Result<Option<ErrorObject>, ErrorObject> {
        self.error
            .as_deref()
            .map(|raw| {
                serde_json::from_str(raw.get()).map_err(|e| {
                    ErrorObject::invalid_downstream_response(format!(
                        "failed to decode error: {}",
                        e
                    ))
                })
            })
            .transpose()
    }

    /// Turn this response into the decoded result or the carried error.
    ///
    /// The error member wins if both are present.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, ErrorObject> {
        if let Some(err) = self.decode_error()? {
            return Err(err);
        }
        self.decode_result()
    }

    pub fn with_version<S: Into<String>>(mut self, version: S) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_id<T: Serialize + ?Sized>(mut self, id: &T) -> Result<Self, ErrorObject> {
        self.id = Some(to_raw(id)?);
        Ok(self)
    }

    pub fn with_null_id(mut self) -> Self {
        self.id = Some(null_raw());
        self
    }

    pub fn with_raw_id(mut self, id: Option<Box<RawValue>>) -> Self {
        self.id = id;
        self
    }

    pub fn set_version<S: Into<String>>(&mut self, version: S) {
        self.version = version.into();
    }

    pub fn set_raw_id(&mut self, id: Option<Box<RawValue>>) {
        self.id = id;
    }
}

impl From<ErrorObject> for ResponseMessage {
    fn from(err: ErrorObject) -> Self {
        ResponseMessage::failure(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Code;

    #[test]
    fn test_round_trip_preserves_bytes() {
        let cases = [
            r#"{"jsonrpc":"2.0","result":"0x1","id":1}"#,
            r#"{"jsonrpc":"2.0","result":null,"id":"abc"}"#,
            r#"{"jsonrpc":"2.0","result":{"balance":123456789012345678901234567890},"id":null}"#,
            r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"method not found: x"},"id":7}"#,
            r#"{"jsonrpc":"2.0","error":{"code":3,"message":"reverted","data":"0x08"},"id":7}"#,
        ];
        for case in cases {
            let resp = ResponseMessage::from_slice(case.as_bytes()).unwrap();
            assert_eq!(std::str::from_utf8(&resp.to_vec().unwrap()).unwrap(), case);
        }
    }

    #[test]
    fn test_null_error_is_absent() {
        let resp =
            ResponseMessage::from_slice(br#"{"jsonrpc":"2.0","result":1,"error":null,"id":1}"#)
                .unwrap();
        assert!(resp.is_success());
        assert!(resp.validate().is_ok());
        assert_eq!(
            std::str::from_utf8(&resp.to_vec().unwrap()).unwrap(),
            r#"{"jsonrpc":"2.0","result":1,"id":1}"#
        );
    }

    #[test]
    fn test_validate_both_result_and_error() {
        let resp = ResponseMessage::from_slice(
            br#"{"jsonrpc":"2.0","result":1,"error":{"code":1,"message":"x"},"id":1}"#,
        )
        .unwrap();
        assert_eq!(resp.validate().unwrap_err().code(), Code::InvalidRequest);
    }

    #[test]
    fn test_validate_neither_result_nor_error() {
        let resp = ResponseMessage::from_slice(br#"{"jsonrpc":"2.0","id":1}"#).unwrap();
        let err = resp.validate().unwrap_err();
        assert_eq!(err.code(), Code::InvalidRequest);
        assert!(err.message().contains("result"));
    }

    #[test]
    fn test_validate_missing_version_and_bad_id() {
        let resp = ResponseMessage::success(&1).unwrap();
        assert!(resp.validate().is_err());

        let resp = ResponseMessage::success(&1)
            .unwrap()
            .with_version("2.0")
            .with_id(&serde_json::json!({"a": 1}))
            .unwrap();
        assert!(resp.validate().unwrap_err().message().contains("object"));
    }

    #[test]
    fn test_into_result() {
        let ok = ResponseMessage::success(&"0x1").unwrap().with_version("2.0");
        assert_eq!(ok.into_result::<String>().unwrap(), "0x1");

        let failed = ResponseMessage::failure(ErrorObject::invalid_params("bad"));
        let err = failed.into_result::<String>().unwrap_err();
        assert_eq!(err.code(), Code::InvalidParams);
        assert_eq!(err.message(), "bad");
    }

    #[test]
    fn test_decode_result_twice_into_different_types() {
        let resp =
            ResponseMessage::from_slice(br#"{"jsonrpc":"2.0","result":[1,2,3],"id":1}"#).unwrap();
        let numbers: Vec<u8> = resp.decode_result().unwrap();
        let value: serde_json::Value = resp.decode_result().unwrap();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(value, serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn test_failure_encoding() {
        let resp = ResponseMessage::failure(ErrorObject::method_not_found("eth_foo"))
            .with_version("2.0")
            .with_null_id();
        assert_eq!(
            std::str::from_utf8(&resp.to_vec().unwrap()).unwrap(),
            r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"method not found: eth_foo"},"id":null}"#
        );
    }
}
