//! Transport and signing kernel
//!
//! Exchange-agnostic building blocks for signed REST calls:
//!
//! - `query`: parameter normalization and canonical query strings
//! - `signer`: `Signer` trait and the HMAC-SHA256 implementation that turns
//!   a parameter map into a `SignedRequest`
//! - `rest`: `RestClient` trait and the reqwest transport that dispatches a
//!   `SignedRequest`, with optional forward proxy
//!
//! Signing is synchronous and holds no mutable state, so a single signer can
//! be shared across any number of in-flight requests. Timeouts, redirects and
//! proxying belong to the transport.

pub mod query;
pub mod rest;
pub mod signer;

pub use query::{build_query_string, is_empty_value, remove_empty_value, ArrayEncoding, ParamMap};
pub use rest::{classify_error, ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
pub use signer::{
    current_timestamp, hmac_sha256_hex, HmacSigner, SignOptions, SignedRequest, Signer,
};
