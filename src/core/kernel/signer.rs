use crate::core::errors::ExchangeError;
use crate::core::kernel::query::{build_query_string, remove_empty_value, ArrayEncoding, ParamMap};
use hmac::{Hmac, Mac};
use reqwest::Method;
use secrecy::{ExposeSecret, Secret};
use serde_json::Value;
use sha2::Sha256;
use std::collections::HashMap;

type HmacSha256 = Hmac<Sha256>;

pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// Per-call overrides applied on top of the signer's own credentials
#[derive(Debug, Clone, Default)]
pub struct SignOptions {
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
    pub array_encoding: ArrayEncoding,
}

impl SignOptions {
    /// Sign with another account's credentials (sub-account keys)
    pub fn with_credentials(api_key: String, secret_key: String) -> Self {
        Self {
            api_key: Some(api_key),
            secret_key: Some(secret_key),
            array_encoding: ArrayEncoding::default(),
        }
    }

    pub const fn with_array_encoding(mut self, encoding: ArrayEncoding) -> Self {
        self.array_encoding = encoding;
        self
    }
}

/// A fully signed request, ready for dispatch. Built fresh for every call.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub method: Method,
    pub path: String,
    /// `path?timestamp=..&signature=..`
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: ParamMap,
    pub timestamp: u64,
    pub signature: String,
    /// Signed with overridden credentials; eligible for the forward proxy
    pub via_proxy: bool,
}

/// Signer trait for request authentication
pub trait Signer: Send + Sync {
    /// Sign `params` for `method path` at `timestamp` (epoch milliseconds)
    fn sign_request(
        &self,
        method: Method,
        path: &str,
        params: &ParamMap,
        options: &SignOptions,
        timestamp: u64,
    ) -> Result<SignedRequest, ExchangeError>;
}

/// HMAC-SHA256 signer for Binance `SIGNED` endpoints
pub struct HmacSigner {
    api_key: Secret<String>,
    secret_key: Secret<String>,
    recv_window: u64,
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner")
            .field("recv_window", &self.recv_window)
            .finish_non_exhaustive()
    }
}

impl HmacSigner {
    pub fn new(api_key: String, secret_key: String, recv_window: u64) -> Self {
        Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            recv_window,
        }
    }

    pub const fn recv_window(&self) -> u64 {
        self.recv_window
    }
}

impl Signer for HmacSigner {
    fn sign_request(
        &self,
        method: Method,
        path: &str,
        params: &ParamMap,
        options: &SignOptions,
        timestamp: u64,
    ) -> Result<SignedRequest, ExchangeError> {
        let mut body = remove_empty_value(params);
        body.insert("recvWindow".to_string(), Value::from(self.recv_window));

        let mut timestamp_params = ParamMap::new();
        timestamp_params.insert("timestamp".to_string(), Value::from(timestamp));
        let query_string = build_query_string(&timestamp_params, ArrayEncoding::Bracketed)?;
        let body_string = build_query_string(&body, options.array_encoding)?;

        tracing::debug!(%query_string, %body_string, "signing payload");

        let secret = options
            .secret_key
            .as_deref()
            .unwrap_or_else(|| self.secret_key.expose_secret().as_str());
        let signature = hmac_sha256_hex(secret, &format!("{}{}", query_string, body_string))?;

        let api_key = options
            .api_key
            .clone()
            .unwrap_or_else(|| self.api_key.expose_secret().clone());

        let mut headers = HashMap::new();
        headers.insert(API_KEY_HEADER.to_string(), api_key);
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());

        Ok(SignedRequest {
            method,
            path: path.to_string(),
            url: format!("{}?timestamp={}&signature={}", path, timestamp, signature),
            headers,
            body,
            timestamp,
            signature,
            via_proxy: options.secret_key.is_some(),
        })
    }
}

/// Lowercase hex HMAC-SHA256 of `payload` under `secret`
pub fn hmac_sha256_hex(secret: &str, payload: &str) -> Result<String, ExchangeError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ExchangeError::AuthError(format!("Failed to create HMAC: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Current epoch time in milliseconds
pub fn current_timestamp() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}
