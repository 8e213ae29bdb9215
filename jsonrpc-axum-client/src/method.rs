//! Typed method descriptors.
//!
//! Instead of binding functions to method names at runtime, callers declare a
//! [`Method`] per RPC with its parameter and result types, then call it
//! through any [`Client`]:
//!
//! ```ignore
//! use jsonrpc_axum_client::{CallOptions, Method};
//!
//! const CHAIN_ID: Method<(), String> = Method::new("eth_chainId");
//! const GET_BALANCE: Method<(String, String), String> = Method::new("eth_getBalance");
//!
//! let chain_id = CHAIN_ID.call(&client, &(), CallOptions::new()).await?;
//! let balance = GET_BALANCE
//!     .call(&client, &(address, "latest".to_string()), CallOptions::new())
//!     .await?;
//! ```

use std::fmt;
use std::marker::PhantomData;

use jsonrpc_axum_core::{ErrorObject, RequestMessage};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{CallOptions, Client, ClientError};

/// An RPC method with parameters `P` and result `R`.
///
/// Params that serialize to `null`, such as `()`, are omitted from the request.
pub struct Method<P, R> {
    name: &'static str,
    _types: PhantomData<fn(P) -> R>,
}

impl<P, R> Method<P, R> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _types: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<P, R> Clone for Method<P, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P, R> Copy for Method<P, R> {}

impl<P, R> fmt::Debug for Method<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Method").field(&self.name).finish()
    }
}

/// Error returned by [`Method::call`].
///
/// Separates failures to complete the call from errors the remote reported.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CallError {
    /// The call did not complete.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// The remote answered with an error object, or with a result that does
    /// not decode into the expected type.
    #[error(transparent)]
    Rpc(#[from] ErrorObject),
}

impl CallError {
    /// Convert into the wire error object.
    pub fn into_error_object(self) -> ErrorObject {
        match self {
            CallError::Client(err) => err.into(),
            CallError::Rpc(err) => err,
        }
    }
}

impl<P, R> Method<P, R>
where
    P: Serialize,
    R: DeserializeOwned,
{
    /// Build the request for this method.
    ///
    /// The request carries no id and no version, so it is meant for a client
    /// decorated with id assignment and a default version.
    pub fn request(&self, params: &P) -> Result<RequestMessage, ErrorObject> {
        let mut request = RequestMessage::new(self.name);
        let params = serde_json::value::to_raw_value(params)?;
        if params.get() != "null" {
            request.set_raw_params(Some(params));
        }
        Ok(request)
    }

    /// Call the method and decode its result.
    pub async fn call<C>(&self, client: &C, params: &P, options: CallOptions) -> Result<R, CallError>
    where
        C: Client + ?Sized,
    {
        let request = self.request(params).map_err(ClientError::InvalidRequest)?;
        let response = client.call(request, options).await?;
        Ok(response.into_result()?)
    }
}
