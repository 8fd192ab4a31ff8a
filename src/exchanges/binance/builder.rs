use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{HmacSigner, ReqwestRest, RestClientBuilder, RestClientConfig};
use crate::exchanges::binance::rest::BinanceRestClient;
use std::sync::Arc;

/// Create a Binance client for signed endpoints
pub fn build_connector(
    config: ExchangeConfig,
) -> Result<BinanceRestClient<ReqwestRest>, ExchangeError> {
    if !config.has_credentials() {
        return Err(ExchangeError::AuthError(
            "API key and secret are required for signed endpoints".to_string(),
        ));
    }

    let rest_config = RestClientConfig::from_exchange_config(&config, "binance");
    let rest = RestClientBuilder::new(rest_config).build()?;

    let signer = Arc::new(HmacSigner::new(
        config.api_key().to_string(),
        config.secret_key().to_string(),
        config.recv_window,
    ));

    Ok(BinanceRestClient::new(rest, signer))
}
