//! Core protocol types for JSON-RPC.
//!
//! This crate provides the wire message model shared by the server
//! (`jsonrpc-axum`) and client (`jsonrpc-axum-client`) crates.
//!
//! ## Modules
//!
//! - `error`: Error codes and the wire error object
//! - `id`: Id validation and correlation keys
//! - `request`: The request message
//! - `response`: The response message
//!
//! Messages keep their `id`, `params`, `result` and `error` members as raw
//! JSON, so decoding is lazy and re-encoding reproduces the received bytes.

mod error;
mod id;
mod request;
mod response;

pub use error::*;
pub use id::{IdKey, validate_id};
pub use request::*;
pub use response::*;

/// Protocol version written when a message does not carry one.
pub const DEFAULT_VERSION: &str = "2.0";
