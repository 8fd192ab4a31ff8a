use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";
pub const TESTNET_BASE_URL: &str = "https://testnet.binance.vision";
pub const DEFAULT_TIMEOUT_MS: u64 = 35_000;
pub const DEFAULT_MAX_REDIRECTS: usize = 2;
pub const DEFAULT_RECV_WINDOW: u64 = 60_000;

/// Forward proxy used for requests signed with per-call credentials
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    /// `user:password`
    pub auth: Option<Secret<String>>,
    pub enabled: bool,
}

impl ProxyConfig {
    #[must_use]
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            auth: None,
            enabled: true,
        }
    }

    #[must_use]
    pub fn with_auth(mut self, auth: String) -> Self {
        self.auth = Some(Secret::new(auth));
        self
    }

    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Split `user:password` into its parts. A bare user gets an empty password.
    pub fn credentials(&self) -> Option<(String, String)> {
        self.auth.as_ref().map(|auth| {
            let auth = auth.expose_secret();
            match auth.split_once(':') {
                Some((user, password)) => (user.to_string(), password.to_string()),
                None => (auth.clone(), String::new()),
            }
        })
    }
}

#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub api_key: Secret<String>,
    pub secret_key: Secret<String>,
    pub testnet: bool,
    pub base_url: Option<String>,
    pub timeout_ms: u64,
    pub max_redirects: usize,
    pub recv_window: u64,
    pub proxy: Option<ProxyConfig>,
}

// Never expose secrets in serialization
impl Serialize for ExchangeConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ExchangeConfig", 9)?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field("secret_key", "[REDACTED]")?;
        state.serialize_field("testnet", &self.testnet)?;
        state.serialize_field("base_url", &self.base_url)?;
        state.serialize_field("timeout_ms", &self.timeout_ms)?;
        state.serialize_field("max_redirects", &self.max_redirects)?;
        state.serialize_field("recv_window", &self.recv_window)?;
        state.serialize_field(
            "proxy_host",
            &self.proxy.as_ref().map(|proxy| proxy.host.as_str()),
        )?;
        state.serialize_field(
            "proxy_enabled",
            &self.proxy.as_ref().is_some_and(|proxy| proxy.enabled),
        )?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for ExchangeConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ProxyHelper {
            host: String,
            port: u16,
            auth: Option<String>,
            #[serde(default)]
            enabled: bool,
        }

        #[derive(Deserialize)]
        struct ExchangeConfigHelper {
            api_key: String,
            secret_key: String,
            #[serde(default)]
            testnet: bool,
            base_url: Option<String>,
            timeout_ms: Option<u64>,
            max_redirects: Option<usize>,
            recv_window: Option<u64>,
            proxy: Option<ProxyHelper>,
        }

        let helper = ExchangeConfigHelper::deserialize(deserializer)?;
        Ok(Self {
            api_key: Secret::new(helper.api_key),
            secret_key: Secret::new(helper.secret_key),
            testnet: helper.testnet,
            base_url: helper.base_url,
            timeout_ms: helper.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
            max_redirects: helper.max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS),
            recv_window: helper.recv_window.unwrap_or(DEFAULT_RECV_WINDOW),
            proxy: helper.proxy.map(|proxy| ProxyConfig {
                host: proxy.host,
                port: proxy.port,
                auth: proxy.auth.map(Secret::new),
                enabled: proxy.enabled,
            }),
        })
    }
}

impl ExchangeConfig {
    /// Create a new configuration with API credentials
    #[must_use]
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            testnet: false,
            base_url: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            recv_window: DEFAULT_RECV_WINDOW,
            proxy: None,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{EXCHANGE}_API_KEY` (e.g., `BINANCE_API_KEY`)
    /// - `{EXCHANGE}_SECRET_KEY` or `{EXCHANGE}_API_SECRET`
    /// - `{EXCHANGE}_TESTNET`, `{EXCHANGE}_BASE_URL` (optional)
    /// - `{EXCHANGE}_TIMEOUT_MS`, `{EXCHANGE}_MAX_REDIRECTS`, `{EXCHANGE}_RECV_WINDOW` (optional)
    /// - `PROXY_HOST`, `PROXY_PORT`, `PROXY_AUTH`, `PROXY_ENABLE` (optional)
    pub fn from_env(exchange_prefix: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(exchange_prefix, |name| env::var(name).ok())
    }

    /// Same as [`Self::from_env`] but reads variables through `lookup`
    pub fn from_lookup<F>(exchange_prefix: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = exchange_prefix.to_uppercase();
        let var = |suffix: &str| lookup(&format!("{}_{}", prefix, suffix));

        let api_key = var("API_KEY")
            .ok_or_else(|| ConfigError::MissingEnvironmentVariable(format!("{}_API_KEY", prefix)))?;

        let secret_key = var("SECRET_KEY").or_else(|| var("API_SECRET")).ok_or_else(|| {
            ConfigError::MissingEnvironmentVariable(format!("{}_SECRET_KEY", prefix))
        })?;

        let testnet = var("TESTNET")
            .and_then(|value| value.parse::<bool>().ok())
            .unwrap_or(false);

        let timeout_ms = parse_or(var("TIMEOUT_MS"), "TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?;
        let max_redirects = parse_or(var("MAX_REDIRECTS"), "MAX_REDIRECTS", DEFAULT_MAX_REDIRECTS)?;
        let recv_window = parse_or(var("RECV_WINDOW"), "RECV_WINDOW", DEFAULT_RECV_WINDOW)?;

        let proxy = match (lookup("PROXY_HOST"), lookup("PROXY_PORT")) {
            (Some(host), Some(port)) => {
                let port = port.parse::<u16>().map_err(|e| {
                    ConfigError::InvalidConfiguration(format!("PROXY_PORT '{}': {}", port, e))
                })?;
                let enabled = lookup("PROXY_ENABLE").is_some_and(|value| value == "true");
                Some(ProxyConfig {
                    host,
                    port,
                    auth: lookup("PROXY_AUTH").map(Secret::new),
                    enabled,
                })
            }
            _ => None,
        };

        Ok(Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            testnet,
            base_url: var("BASE_URL"),
            timeout_ms,
            max_redirects,
            recv_window,
            proxy,
        })
    }

    /// Create configuration from .env file and environment variables
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(exchange_prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(exchange_prefix, ".env")
    }

    /// Create configuration from a specific .env file path
    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(
        exchange_prefix: &str,
        env_file_path: &str,
    ) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            // no file is fine, fall back to the process environment
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(exchange_prefix)
    }

    /// Check if this configuration has valid credentials for authenticated operations
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.api_key.expose_secret().is_empty() && !self.secret_key.expose_secret().is_empty()
    }

    /// Set testnet mode
    #[must_use]
    pub const fn testnet(mut self, testnet: bool) -> Self {
        self.testnet = testnet;
        self
    }

    /// Set custom base URL
    #[must_use]
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub const fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    #[must_use]
    pub const fn with_recv_window(mut self, recv_window: u64) -> Self {
        self.recv_window = recv_window;
        self
    }

    #[must_use]
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Effective base URL: testnet wins, then the override, then mainnet
    pub fn resolved_base_url(&self) -> String {
        if self.testnet {
            TESTNET_BASE_URL.to_string()
        } else {
            self.base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
        }
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get API key (use carefully - exposes secret)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Get secret key (use carefully - exposes secret)
    pub fn secret_key(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

fn parse_or<T>(raw: Option<String>, name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.map_or(Ok(default), |value| {
        value
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidConfiguration(format!("{} '{}': {}", name, value, e)))
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
