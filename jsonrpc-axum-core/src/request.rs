//! JSON-RPC request message.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::ErrorObject;
use crate::id::{IdKey, present, to_raw, validate_id};

/// A JSON-RPC request.
///
/// `id` and `params` are kept as the raw JSON received (or encoded when set),
/// so they can be decoded later into whatever type the consumer needs, and
/// more than once, without loss of precision.
///
/// An absent id and an explicit `"id":null` are different messages: the first
/// is a notification and is encoded without an `id` member, the second keeps
/// `"id":null` on the wire.
///
/// # Wire Format
///
/// ```json
/// {"jsonrpc":"2.0","method":"eth_chainId","params":[],"id":1}
/// ```
///
/// # Example
///
/// ```
/// use jsonrpc_axum_core::RequestMessage;
///
/// let req = RequestMessage::new("eth_getBalance")
///     .with_version("2.0")
///     .with_params(&("0xabc", "latest"))?
///     .with_id(&7)?;
///
/// assert_eq!(
///     std::str::from_utf8(&req.to_vec()?).unwrap(),
///     r#"{"jsonrpc":"2.0","method":"eth_getBalance","params":["0xabc","latest"],"id":7}"#
/// );
///
/// let (address, block): (String, String) = req.decode_params()?;
/// assert_eq!(address, "0xabc");
/// assert_eq!(block, "latest");
/// # Ok::<(), jsonrpc_axum_core::ErrorObject>(())
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RequestMessage {
    #[serde(rename = "jsonrpc", default)]
    version: String,
    #[serde(default)]
    method: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    params: Option<Box<RawValue>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    id: Option<Box<RawValue>>,
}

impl RequestMessage {
    /// Create a request for `method` with no version, params or id.
    pub fn new<S: Into<String>>(method: S) -> Self {
        Self {
            method: method.into(),
            ..Default::default()
        }
    }

    /// Decode a request from wire bytes.
    ///
    /// Only the JSON syntax and member types are checked here; call
    /// [`validate`](Self::validate) for the protocol rules.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ErrorObject> {
        serde_json::from_slice(bytes)
            .map_err(|e| ErrorObject::parse_error(format!("invalid request body: {}", e)))
    }

    /// Encode this request to wire bytes.
    pub fn to_vec(&self) -> Result<Vec<u8>, ErrorObject> {
        serde_json::to_vec(self)
            .map_err(|e| ErrorObject::internal(format!("failed to encode request: {}", e)))
    }

    /// Encode this request into a [`Bytes`] frame.
    pub fn to_bytes(&self) -> Result<Bytes, ErrorObject> {
        self.to_vec().map(Bytes::from)
    }

    /// Check the request against the protocol rules.
    ///
    /// Fails with [`InvalidRequest`](crate::Code::InvalidRequest) if the version or
    /// method is empty, or if the id is not a scalar.
    pub fn validate(&self) -> Result<(), ErrorObject> {
        if self.version.is_empty() {
            return Err(ErrorObject::invalid_request("missing version"));
        }
        if self.method.is_empty() {
            return Err(ErrorObject::invalid_request("missing method"));
        }
        validate_id(self.id.as_deref())
    }

    /// Get the protocol version (`jsonrpc` member).
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Get the method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Get the raw id, if present. An explicit `null` id is `Some("null")`.
    pub fn raw_id(&self) -> Option<&RawValue> {
        self.id.as_deref()
    }

    /// Get the raw params, if present.
    pub fn raw_params(&self) -> Option<&RawValue> {
        self.params.as_deref()
    }

    /// Whether the request carries an `id` member (null included).
    pub fn has_id(&self) -> bool {
        self.id.is_some()
    }

    /// Correlation key for this request's id, if it has one.
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

    /// Decode the params into `T`.
    ///
    /// Absent params decode as JSON `null`, so `()` and `Option<_>` targets
    /// accept a request without params. Failures are reported as
    /// [`InvalidParams`](crate::Code::InvalidParams).
    pub fn decode_params<T: DeserializeOwned>(&self) -> Result<T, ErrorObject> {
        let raw = self.params.as_deref().map(RawValue::get).unwrap_or("null");
        serde_json::from_str(raw).map_err(|e| ErrorObject::invalid_params(e.to_string()))
    }

    /// Set the protocol version.
    pub fn with_version<S: Into<String>>(mut self, version: S) -> Self {
        self.version = version.into();
        self
    }

    /// Set the method name.
    pub fn with_method<S: Into<String>>(mut self, method: S) -> Self {
        self.method = method.into();
        self
    }

    /// Set the id by encoding `id`.
    pub fn with_id<T: Serialize + ?Sized>(mut self, id: &T) -> Result<Self, ErrorObject> {
        self.id = Some(to_raw(id)?);
        Ok(self)
    }

    /// Set an explicit `null` id.
    pub fn with_null_id(mut self) -> Self {
        self.id = Some(null_raw());
        self
    }

    /// Set the params by encoding `params`.
    pub fn with_params<T: Serialize + ?Sized>(mut self, params: &T) -> Result<Self, ErrorObject> {
        self.params = Some(to_raw(params)?);
        Ok(self)
    }

    /// Replace the version in place.
    pub fn set_version<S: Into<String>>(&mut self, version: S) {
        self.version = version.into();
    }

    /// Replace the raw id in place; `None` removes the member.
    pub fn set_raw_id(&mut self, id: Option<Box<RawValue>>) {
        self.id = id;
    }

    /// Replace the raw params in place; `None` removes the member.
    pub fn set_raw_params(&mut self, params: Option<Box<RawValue>>) {
        self.params = params;
    }
}

pub(crate) fn null_raw() -> Box<RawValue> {
    // "null" is a valid JSON document
    RawValue::from_string("null".to_owned()).expect("null is valid JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Code;

    #[test]
    fn test_round_trip_preserves_bytes() {
        let cases = [
            r#"{"jsonrpc":"2.0","method":"eth_chainId","id":1}"#,
            r#"{"jsonrpc":"2.0","method":"eth_call","params":[{"to":"0x1"},"latest"],"id":"abc"}"#,
            r#"{"jsonrpc":"2.0","method":"eth_subscribe","params":null,"id":null}"#,
            r#"{"jsonrpc":"2.0","method":"notify","params":{"value":1.000000000000000000001}}"#,
        ];
        for case in cases {
            let req = RequestMessage::from_slice(case.as_bytes()).unwrap();
            assert_eq!(std::str::from_utf8(&req.to_vec().unwrap()).unwrap(), case);
        }
    }

    #[test]
    fn test_absent_and_null_id_are_distinct() {
        let absent = RequestMessage::from_slice(br#"{"jsonrpc":"2.0","method":"m"}"#).unwrap();
        let null = RequestMessage::from_slice(br#"{"jsonrpc":"2.0","method":"m","id":null}"#).unwrap();

        assert!(!absent.has_id());
        assert!(null.has_id());
        assert_eq!(null.raw_id().unwrap().get(), "null");
        assert_eq!(null.decode_id::<Option<u64>>().unwrap(), Some(None));
        assert_eq!(absent.decode_id::<u64>().unwrap(), None);
    }

    #[test]
    fn test_decode_id_into_different_types() {
        let req = RequestMessage::from_slice(br#"{"jsonrpc":"2.0","method":"m","id":12}"#).unwrap();

        let as_u64: Option<u64> = req.decode_id().unwrap();
        let as_value: Option<serde_json::Value> = req.decode_id().unwrap();
        let as_f64: Option<f64> = req.decode_id().unwrap();

        assert_eq!(as_u64, Some(12));
        assert_eq!(as_value, Some(serde_json::json!(12)));
        assert_eq!(as_f64, Some(12.0));
    }

    #[test]
    fn test_decode_params_twice() {
        let req = RequestMessage::from_slice(
            br#"{"jsonrpc":"2.0","method":"m","params":["0x10",true],"id":1}"#,
        )
        .unwrap();

        let typed: (String, bool) = req.decode_params().unwrap();
        let untyped: Vec<serde_json::Value> = req.decode_params().unwrap();
        assert_eq!(typed, ("0x10".to_string(), true));
        assert_eq!(untyped.len(), 2);
    }

    #[test]
    fn test_decode_params_mismatch_is_invalid_params() {
        let req = RequestMessage::new("m").with_params(&[1, 2]).unwrap();
        let err = req.decode_params::<String>().unwrap_err();
        assert_eq!(err.code(), Code::InvalidParams);
    }

    #[test]
    fn test_absent_params_decode_as_null() {
        let req = RequestMessage::new("m");
        let unit: () = req.decode_params().unwrap();
        let opt: Option<Vec<u8>> = req.decode_params().unwrap();
        assert_eq!(unit, ());
        assert!(opt.is_none());
    }

    #[test]
    fn test_validate() {
        let ok = RequestMessage::new("eth_chainId").with_version("2.0");
        assert!(ok.validate().is_ok());

        let no_version = RequestMessage::new("eth_chainId");
        assert_eq!(no_version.validate().unwrap_err().code(), Code::InvalidRequest);

        let no_method = RequestMessage::default().with_version("2.0");
        assert_eq!(no_method.validate().unwrap_err().code(), Code::InvalidRequest);

        let bad_id = RequestMessage::new("m")
            .with_version("2.0")
            .with_id(&[1, 2])
            .unwrap();
        let err = bad_id.validate().unwrap_err();
        assert_eq!(err.code(), Code::InvalidRequest);
        assert!(err.message().contains("array"));
    }

    #[test]
    fn test_clone_is_independent() {
        let original = RequestMessage::new("m").with_id(&1).unwrap();
        let mut copy = original.clone();
        copy.set_raw_id(None);
        copy.set_version("1.0");

        assert_eq!(original.raw_id().unwrap().get(), "1");
        assert_eq!(original.version(), "");
        assert!(!copy.has_id());
    }

    #[test]
    fn test_malformed_bytes_are_parse_errors() {
        let err = RequestMessage::from_slice(b"{not json").unwrap_err();
        assert_eq!(err.code(), Code::ParseError);
    }
}
