use crate::core::errors::ExchangeError;
use crate::core::kernel::{current_timestamp, ParamMap, RestClient, SignOptions, Signer};
use crate::exchanges::binance::types::{AppliedDeposit, DepositCreditRequest};
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, instrument};

pub const DEPOSIT_CREDIT_APPLY_PATH: &str = "/sapi/v1/capital/deposit/credit-apply";

/// Thin typed wrapper around `RestClient` for Binance `SIGNED` endpoints
pub struct BinanceRestClient<R: RestClient> {
    client: R,
    signer: Arc<dyn Signer>,
}

impl<R: RestClient> BinanceRestClient<R> {
    pub fn new(client: R, signer: Arc<dyn Signer>) -> Self {
        Self { client, signer }
    }

    pub fn rest(&self) -> &R {
        &self.client
    }

    /// Sign `params` with a fresh timestamp and dispatch the request
    pub async fn signed_request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &ParamMap,
        options: &SignOptions,
    ) -> Result<T, ExchangeError> {
        let request = self
            .signer
            .sign_request(method, path, params, options, current_timestamp())?;
        self.client.send_json(&request).await
    }

    /// Apply deposit credit with the configured credentials
    pub async fn apply_deposit_credit(
        &self,
        request: &DepositCreditRequest,
    ) -> Result<AppliedDeposit, ExchangeError> {
        self.apply_deposit_credit_with(request, &SignOptions::default())
            .await
    }

    /// Apply deposit credit, optionally signing with another account's keys
    #[instrument(skip(self, options), fields(exchange = "binance", tx_id = %request.tx_id))]
    pub async fn apply_deposit_credit_with(
        &self,
        request: &DepositCreditRequest,
        options: &SignOptions,
    ) -> Result<AppliedDeposit, ExchangeError> {
        debug!(payload = ?request, "Apply deposit requested");

        let params = request.to_params()?;
        let response: AppliedDeposit = self
            .signed_request_json(Method::POST, DEPOSIT_CREDIT_APPLY_PATH, &params, options)
            .await?;

        debug!(response = ?response, "Apply deposit response");
        Ok(response)
    }
}
