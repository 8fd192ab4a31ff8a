use crate::core::config::{ConfigError, ExchangeConfig, ProxyConfig};
use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::SignedRequest;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{redirect, Client, Proxy, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, trace};

pub const USED_WEIGHT_HEADER: &str = "x-mbx-used-weight";
pub const USED_WEIGHT_1M_HEADER: &str = "x-mbx-used-weight-1m";

/// REST client trait for dispatching signed requests
///
/// Implementations own the transport concerns (timeouts, redirects, proxying)
/// and turn upstream failures into [`ExchangeError`] values.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Send a signed request and return the response body as JSON
    async fn send(&self, request: &SignedRequest) -> Result<Value, ExchangeError>;

    /// Send a signed request with a strongly-typed response
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: &SignedRequest,
    ) -> Result<T, ExchangeError>;
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Exchange name for logging and tracing
    pub exchange_name: String,
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
    /// Only used when enabled, and only for requests flagged `via_proxy`
    pub proxy: Option<ProxyConfig>,
}

impl RestClientConfig {
    pub fn new(base_url: String, exchange_name: String) -> Self {
        Self {
            base_url,
            exchange_name,
            timeout: Duration::from_millis(crate::core::config::DEFAULT_TIMEOUT_MS),
            max_redirects: crate::core::config::DEFAULT_MAX_REDIRECTS,
            user_agent: "binance-capital/0.1".to_string(),
            proxy: None,
        }
    }

    /// Transport settings taken from an exchange configuration
    pub fn from_exchange_config(config: &ExchangeConfig, exchange_name: &str) -> Self {
        Self::new(config.resolved_base_url(), exchange_name.to_string())
            .with_timeout(config.timeout())
            .with_max_redirects(config.max_redirects)
            .with_proxy(config.proxy.clone())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<ProxyConfig>) -> Self {
        self.proxy = proxy;
        self
    }
}

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
}

impl RestClientBuilder {
    pub fn new(config: RestClientConfig) -> Self {
        Self { config }
    }

    /// Build the REST client. A proxied client is only created when the
    /// proxy is configured and enabled.
    pub fn build(self) -> Result<ReqwestRest, ExchangeError> {
        let client = self.client_builder().build().map_err(|e| {
            ConfigError::InvalidConfiguration(format!("Failed to build HTTP client: {}", e))
        })?;

        let proxy_client = match self.config.proxy.as_ref().filter(|proxy| proxy.enabled) {
            Some(proxy_config) => {
                let mut proxy = Proxy::all(proxy_config.url()).map_err(|e| {
                    ConfigError::InvalidConfiguration(format!("Invalid proxy: {}", e))
                })?;
                if let Some((user, password)) = proxy_config.credentials() {
                    proxy = proxy.basic_auth(&user, &password);
                }
                let client = self.client_builder().proxy(proxy).build().map_err(|e| {
                    ConfigError::InvalidConfiguration(format!(
                        "Failed to build proxied HTTP client: {}",
                        e
                    ))
                })?;
                Some(client)
            }
            None => None,
        };

        Ok(ReqwestRest {
            client,
            proxy_client,
            config: self.config,
        })
    }

    fn client_builder(&self) -> reqwest::ClientBuilder {
        Client::builder()
            .timeout(self.config.timeout)
            .redirect(redirect::Policy::limited(self.config.max_redirects))
            .user_agent(&self.config.user_agent)
    }
}

/// Implementation of `RestClient` using reqwest
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    proxy_client: Option<Client>,
    config: RestClientConfig,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("base_url", &self.config.base_url)
            .field("exchange_name", &self.config.exchange_name)
            .field("has_proxy", &self.proxy_client.is_some())
            .finish_non_exhaustive()
    }
}

impl ReqwestRest {
    pub fn new(base_url: String, exchange_name: String) -> Result<Self, ExchangeError> {
        RestClientBuilder::new(RestClientConfig::new(base_url, exchange_name)).build()
    }

    pub fn config(&self) -> &RestClientConfig {
        &self.config
    }

    pub fn has_proxy(&self) -> bool {
        self.proxy_client.is_some()
    }

    fn build_url(&self, request: &SignedRequest) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), request.url)
    }

    /// Requests signed with overridden credentials go through the proxy, if one is enabled
    fn client_for(&self, request: &SignedRequest) -> &Client {
        match (&self.proxy_client, request.via_proxy) {
            (Some(proxy_client), true) => proxy_client,
            _ => &self.client,
        }
    }

    fn log_rate_limit(&self, request: &SignedRequest, status: StatusCode, headers: &HeaderMap) {
        let used_weight = headers
            .get(USED_WEIGHT_HEADER)
            .and_then(|value| value.to_str().ok());
        let used_weight_1m = headers
            .get(USED_WEIGHT_1M_HEADER)
            .and_then(|value| value.to_str().ok());

        match (used_weight, used_weight_1m) {
            (Some(used_weight), Some(used_weight_1m)) => debug!(
                exchange = %self.config.exchange_name,
                method = %request.method,
                path = %request.path,
                %status,
                used_weight,
                used_weight_1m,
                "request weight usage"
            ),
            _ => debug!(
                exchange = %self.config.exchange_name,
                method = %request.method,
                path = %request.path,
                %status,
                ?headers,
                "response headers"
            ),
        }
    }

    #[instrument(skip(self, request, response), fields(exchange = %self.config.exchange_name, status = %response.status()))]
    async fn handle_response(
        &self,
        request: &SignedRequest,
        response: Response,
    ) -> Result<Value, ExchangeError> {
        let status = response.status();
        self.log_rate_limit(request, status, response.headers());

        let response_text = response.text().await.map_err(|e| {
            ExchangeError::network(format!("Failed to read response body: {}", e))
        })?;

        trace!("Response body: {}", response_text);

        if status.is_success() {
            serde_json::from_str(&response_text).map_err(|e| {
                ExchangeError::DeserializationError(format!("Failed to parse JSON response: {}", e))
            })
        } else {
            Err(classify_error(status, &response_text))
        }
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    #[instrument(skip(self, request), fields(exchange = %self.config.exchange_name, method = %request.method, path = %request.path))]
    async fn send(&self, request: &SignedRequest) -> Result<Value, ExchangeError> {
        let body = serde_json::to_vec(&request.body).map_err(|e| {
            ExchangeError::SerializationError(format!("Failed to serialize request body: {}", e))
        })?;

        let mut builder = self
            .client_for(request)
            .request(request.method.clone(), self.build_url(request))
            .body(body);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ExchangeError::network(format!("Request failed: {}", e)))?;

        self.handle_response(request, response).await
    }

    #[instrument(skip(self, request), fields(exchange = %self.config.exchange_name, method = %request.method, path = %request.path))]
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: &SignedRequest,
    ) -> Result<T, ExchangeError> {
        self.send(request).await.and_then(|value| {
            serde_json::from_value(value).map_err(|e| {
                ExchangeError::DeserializationError(format!("Failed to deserialize JSON: {}", e))
            })
        })
    }
}

/// Turn a non-2xx response into the matching error kind
///
/// `{"code": .., "msg": ..}` is a business error; any other payload is passed
/// through as malformed; no payload at all is a generic failure.
pub fn classify_error(status: StatusCode, body: &str) -> ExchangeError {
    if body.trim().is_empty() {
        return ExchangeError::network(format!(
            "Request failed with status code {}",
            status.as_u16()
        ));
    }

    let payload =
        serde_json::from_str::<Value>(body).unwrap_or_else(|_| Value::String(body.to_string()));
    let code = payload
        .get("code")
        .and_then(Value::as_i64)
        .unwrap_or_else(|| i64::from(status.as_u16()));

    match payload.get("msg").and_then(Value::as_str) {
        Some(message) => ExchangeError::ApiError {
            code,
            message: message.to_string(),
        },
        None => ExchangeError::MalformedApiError { code, payload },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_business_error() {
        let err = classify_error(
            StatusCode::BAD_REQUEST,
            r#"{"code":-1102,"msg":"Mandatory parameter 'txId' was not sent."}"#,
        );
        match err {
            ExchangeError::ApiError { code, message } => {
                assert_eq!(code, -1102);
                assert_eq!(message, "Mandatory parameter 'txId' was not sent.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_classify_business_error_without_code_uses_status() {
        let err = classify_error(StatusCode::FORBIDDEN, r#"{"msg":"forbidden"}"#);
        assert_eq!(err.status_code(), Some(403));
    }

    #[test]
    fn test_classify_malformed_error() {
        let err = classify_error(StatusCode::BAD_GATEWAY, r#"{"code":-1,"error":"oops"}"#);
        match err {
            ExchangeError::MalformedApiError { code, payload } => {
                assert_eq!(code, -1);
                assert_eq!(payload, json!({"code": -1, "error": "oops"}));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_classify_plain_text_error() {
        let err = classify_error(StatusCode::SERVICE_UNAVAILABLE, "upstream down");
        match err {
            ExchangeError::MalformedApiError { code, payload } => {
                assert_eq!(code, 503);
                assert_eq!(payload, json!("upstream down"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_classify_empty_body() {
        let err = classify_error(StatusCode::BAD_REQUEST, "  ");
        assert!(matches!(err, ExchangeError::NetworkError { status: 500, .. }));
    }

    #[test]
    fn test_proxy_client_only_when_enabled() {
        let disabled = RestClientConfig::new("http://localhost".to_string(), "binance".to_string())
            .with_proxy(Some(ProxyConfig::new("127.0.0.1".to_string(), 3128).enabled(false)));
        assert!(!RestClientBuilder::new(disabled).build().unwrap().has_proxy());

        let enabled = RestClientConfig::new("http://localhost".to_string(), "binance".to_string())
            .with_proxy(Some(
                ProxyConfig::new("127.0.0.1".to_string(), 3128).with_auth("user:pass".to_string()),
            ));
        assert!(RestClientBuilder::new(enabled).build().unwrap().has_proxy());
    }

    #[test]
    fn test_from_exchange_config() {
        let config = ExchangeConfig::new("k".to_string(), "s".to_string())
            .base_url("http://localhost:8080/".to_string())
            .with_timeout_ms(1500)
            .with_max_redirects(0);
        let rest_config = RestClientConfig::from_exchange_config(&config, "binance");
        assert_eq!(rest_config.base_url, "http://localhost:8080/");
        assert_eq!(rest_config.timeout, Duration::from_millis(1500));
        assert_eq!(rest_config.max_redirects, 0);
        assert!(rest_config.proxy.is_none());
    }
}
